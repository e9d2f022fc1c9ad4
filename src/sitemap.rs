use std::collections::HashSet;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use tracing::info;

use crate::fetch::Fetcher;

/// Fetch a sitemap and return its page URLs, deduplicated, in file order.
pub async fn fetch_page_urls(fetcher: &Fetcher, sitemap_url: &str) -> Result<Vec<String>> {
    info!("Fetching sitemap: {}", sitemap_url);
    let xml = fetcher
        .fetch_html(sitemap_url)
        .await
        .context("Failed to fetch sitemap")?;

    let mut seen = HashSet::new();
    let urls: Vec<String> = parse_urlset(&xml)?
        .into_iter()
        .filter(|u| seen.insert(u.clone()))
        .collect();
    info!("Page URLs in sitemap: {}", urls.len());
    Ok(urls)
}

/// Parse a urlset XML and return all <loc> URLs.
pub fn parse_urlset(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let loc = e.unescape()?.trim().to_string();
                if !loc.is_empty() {
                    urls.push(loc);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context(format!(
                "Malformed sitemap at byte {}",
                reader.buffer_position()
            )),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_locs_from_urlset() {
        let xml = std::fs::read_to_string("tests/fixtures/sitemap.xml").unwrap();
        let urls = parse_urlset(&xml).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/blog/choosing-a-torque-wrench",
                "https://example.com/blog/impact-vs-drill?ref=a&b=c",
                "https://example.com/blog/choosing-a-torque-wrench",
            ]
        );
    }

    #[test]
    fn ignores_loc_outside_url() {
        let xml = concat!(
            "<sitemapindex><sitemap><loc>https://example.com/s1.xml</loc>",
            "</sitemap></sitemapindex>",
        );
        assert!(parse_urlset(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_errors() {
        assert!(parse_urlset("<urlset><url><loc>x</url></urlset>").is_err());
    }
}
