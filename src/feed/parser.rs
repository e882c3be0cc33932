use std::borrow::Cow;

use feed_rs::parser;
use sha2::{Digest, Sha256};

use super::article::Article;
use crate::util::{clean_title, strip_control_chars};

/// Parse RSS/Atom bytes into articles, in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Article>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let articles = feed
        .entries
        .into_iter()
        .map(|entry| {
            let links: Vec<String> = entry.links.into_iter().map(|l| l.href).collect();
            let published = entry.published.or(entry.updated);
            let description = entry.summary.map(|s| s.content);
            let content = entry.content.and_then(|c| c.body);
            let title = entry
                .title
                .map(|t| clean_title(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            let authors = entry
                .authors
                .into_iter()
                .map(|p| sanitize(p.name))
                .filter(|name| !name.is_empty())
                .collect();

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let guid = generate_guid(
                existing_id,
                links.first().map(String::as_str),
                &title,
                published.map(|dt| dt.timestamp()),
            );

            Article {
                guid,
                title,
                links,
                published,
                updated: entry.updated,
                description,
                content,
                authors,
            }
        })
        .collect();

    Ok(articles)
}

fn sanitize(s: String) -> String {
    match strip_control_chars(&s) {
        Cow::Borrowed(_) => s,
        Cow::Owned(clean) => clean,
    }
}

fn generate_guid(
    existing: Option<&str>,
    url: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        url.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <item>
        <guid>item-1</guid>
        <title>First post</title>
        <link>https://example.com/1</link>
        <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
        <description>Hello</description>
        <author>alice@example.com (Alice)</author>
    </item>
    <item>
        <title>No guid</title>
        <link>https://example.com/2</link>
    </item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss_fields() {
        let articles = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.guid, "item-1");
        assert_eq!(first.title, "First post");
        assert_eq!(first.link(), Some("https://example.com/1"));
        assert_eq!(first.published.map(|d| d.timestamp()), Some(1704067200));
        assert_eq!(first.description.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_missing_guid_is_generated() {
        let articles = parse_feed(RSS.as_bytes()).unwrap();
        let second = &articles[1];
        assert_eq!(second.title, "No guid");
        assert!(!second.guid.is_empty());
        assert!(second.published.is_none());
    }

    #[test]
    fn test_generate_guid_is_deterministic() {
        let a = generate_guid(None, Some("https://example.com"), "t", Some(1));
        let b = generate_guid(None, Some("https://example.com"), "t", Some(1));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(generate_guid(Some("  id  "), None, "t", None), "id");
    }

    #[test]
    fn test_sanitize_keeps_clean_input() {
        assert_eq!(sanitize("Bad\u{1b}[31mRed".to_string()), "BadRed");
        assert_eq!(sanitize("Alice".to_string()), "Alice");
    }

    #[test]
    fn test_blank_title_becomes_untitled() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel>
            <item><guid>x</guid><title>   </title></item></channel></rss>"#;
        let articles = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(articles[0].title, "Untitled");
    }

    #[test]
    fn test_invalid_xml_is_error() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }
}
