//! RSS/Atom parser backed by `feed-rs`.

use std::io::BufRead;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::{FeedParser, ParseError};
use crate::feed::{Feed, FeedItem, ItemKind};

/// The built-in parser for RSS 2.0 and Atom documents.
///
/// Registered as `"rss"`. Stateless: every `parse` call starts from a fresh
/// feed and hands it back by value.
#[derive(Debug, Default)]
pub struct RssParser;

impl RssParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for RssParser {
    fn parse(
        &mut self,
        input: &mut dyn BufRead,
        max_items: usize,
        cancel: &CancellationToken,
    ) -> Result<Feed, ParseError> {
        let parsed = feed_rs::parser::parse(input)
            .map_err(|e| ParseError::InvalidDocument(e.to_string()))?;

        let mut feed = Feed::new(ItemKind::RssFeed);
        if let Some(title) = &parsed.title {
            feed.set_value("title", &title.content);
        }
        if let Some(description) = &parsed.description {
            feed.set_value("description", &description.content);
        }
        if let Some(link) = parsed.links.first() {
            feed.set_value("link", &link.href);
        }
        if let Some(updated) = parsed.updated {
            feed.set_value("updated", &updated.timestamp().to_string());
        }
        if let Some(language) = &parsed.language {
            feed.set_value("language", language);
        }
        if let Some(generator) = &parsed.generator {
            feed.set_value("generator", &generator.content);
        }
        for category in &parsed.categories {
            feed.set_value("category", &category.term);
        }

        for entry in parsed.entries {
            // Cooperative cancellation, polled per article: stop converting
            // and hand back whatever is populated so far.
            if cancel.is_cancelled() {
                tracing::debug!(
                    articles = feed.article_count(),
                    "cancellation observed mid-parse, returning partial feed"
                );
                break;
            }
            if max_items > 0 && feed.article_count() >= max_items {
                break;
            }

            let mut article = FeedItem::new(ItemKind::RssArticle);

            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());
            let url = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let guid = generate_guid(existing_id, url.as_deref(), &title, published);

            article.set_value("title", &title);
            article.set_value("guid", &guid);
            if let Some(url) = &url {
                article.set_value("link", url);
            }
            if let Some(published) = published {
                article.set_value("published", &published.to_string());
            }
            if let Some(summary) = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
            {
                article.set_value("summary", &summary);
            }
            if let Some(author) = entry.authors.first() {
                article.set_value("author", &author.name);
            }
            for category in &entry.categories {
                article.set_value("category", &category.term);
            }

            feed.add_article(article);
        }

        Ok(feed)
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
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example Feed</title>
    <link>https://example.com</link>
    <description>Sample</description>
    <generator>FeedForge 1.0</generator>
    <category>news</category>
    <category>tech</category>
    <item>
        <guid>item-1</guid>
        <title>First Post</title>
        <link>https://example.com/1</link>
        <category>rust</category>
        <category>feeds</category>
    </item>
    <item>
        <guid>item-2</guid>
        <title>Second Post</title>
        <link>https://example.com/2</link>
    </item>
    <item>
        <guid>item-3</guid>
        <link>https://example.com/3</link>
    </item>
</channel></rss>"#;

    fn parse_sample(max_items: usize, cancel: &CancellationToken) -> Feed {
        let mut input = Cursor::new(SAMPLE_RSS.as_bytes());
        RssParser::new()
            .parse(&mut input, max_items, cancel)
            .unwrap()
    }

    #[test]
    fn test_parse_populates_envelope_and_articles() {
        let feed = parse_sample(0, &CancellationToken::new());

        assert_eq!(feed.value("title"), Some("Example Feed"));
        assert_eq!(feed.value("link"), Some("https://example.com"));
        assert_eq!(feed.article_count(), 3);
        assert_eq!(feed.article(0).unwrap().value("title"), Some("First Post"));
        assert_eq!(feed.article(0).unwrap().value("guid"), Some("item-1"));
        assert_eq!(
            feed.article(1).unwrap().value("link"),
            Some("https://example.com/2")
        );
    }

    #[test]
    fn test_envelope_generator_and_categories_mapped() {
        let feed = parse_sample(0, &CancellationToken::new());
        assert_eq!(feed.value("generator"), Some("FeedForge 1.0"));
        assert_eq!(feed.value("category"), Some("news, tech"));
    }

    #[test]
    fn test_categories_join_as_list_value() {
        let feed = parse_sample(0, &CancellationToken::new());
        assert_eq!(
            feed.article(0).unwrap().value("category"),
            Some("rust, feeds")
        );
    }

    #[test]
    fn test_missing_title_falls_back_to_untitled() {
        let feed = parse_sample(0, &CancellationToken::new());
        assert_eq!(feed.article(2).unwrap().value("title"), Some("Untitled"));
    }

    #[test]
    fn test_max_items_caps_article_count() {
        let feed = parse_sample(2, &CancellationToken::new());
        assert_eq!(feed.article_count(), 2);
        assert_eq!(feed.article(0).unwrap().value("guid"), Some("item-1"));
    }

    #[test]
    fn test_zero_max_items_means_uncapped() {
        let feed = parse_sample(0, &CancellationToken::new());
        assert_eq!(feed.article_count(), 3);
    }

    #[test]
    fn test_pre_cancelled_token_yields_empty_partial_feed() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let feed = parse_sample(0, &cancel);

        // Envelope is still populated; article conversion stopped at the
        // first poll. Partial results are a successful parse.
        assert_eq!(feed.value("title"), Some("Example Feed"));
        assert_eq!(feed.article_count(), 0);
    }

    #[test]
    fn test_invalid_document_is_parse_error() {
        let mut input = Cursor::new(&b"<not a feed"[..]);
        let result = RssParser::new().parse(&mut input, 0, &CancellationToken::new());
        assert!(matches!(result, Err(ParseError::InvalidDocument(_))));
    }

    #[test]
    fn test_guid_fallback_is_deterministic() {
        let a = generate_guid(None, Some("https://example.com/x"), "Title", Some(1700000000));
        let b = generate_guid(None, Some("https://example.com/x"), "Title", Some(1700000000));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex-encoded SHA-256

        let existing = generate_guid(Some("  keep-me  "), None, "Title", None);
        assert_eq!(existing, "keep-me");
    }
}
