/// Strip commas that directly precede `}` / `]` (whitespace allowed between)
/// and a comma left dangling at the end of the text.
///
/// Commas inside string literals are left alone, so running this on text that
/// already parses never changes its meaning. Only whitespace may sit between
/// the comma and the closer: `[1,,]` stays broken.
pub fn repair_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Whitespace seen since an unemitted comma.
    let mut pending: Option<String> = None;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if let Some(ws) = pending.as_mut() {
            if c.is_whitespace() {
                ws.push(c);
                continue;
            }
        }
        if let Some(ws) = pending.take() {
            if c != '}' && c != ']' {
                out.push(',');
            }
            out.push_str(&ws);
        }

        match c {
            ',' => pending = Some(String::new()),
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    // Trailing comma at the very end is dropped, its whitespace kept.
    if let Some(ws) = pending {
        out.push_str(&ws);
    }
    out
}
