//! Wire format for feeds crossing a process or storage boundary.
//!
//! Layout, all integers little-endian, strings as u32 length + UTF-8 bytes:
//!
//! ```text
//! envelope kind tag (u8)
//! envelope field count (u32), then that many (key, value) pairs
//! article count (u32)
//! max_item_data (u32)
//! per article: kind tag (u8), stored pair count (u32, capped at
//!              max_item_data), then that many (key, value) pairs
//! ```
//!
//! Articles wider than `max_item_data` are truncated at the cap on write;
//! the dropped fields are gone, not an error. Decoding is total: damaged
//! input degrades to an empty feed (logged at warn) instead of propagating
//! an error to the caller.

use std::io::{self, Read, Write};

use thiserror::Error;

use super::item::{Feed, FeedItem, ItemKind};

/// Internal decode failure. Never escapes [`decode`]; surfaced only in logs.
#[derive(Debug, Error)]
enum WireError {
    #[error("unknown item kind tag: {0}")]
    UnknownKind(u8),

    #[error("field data is not valid UTF-8")]
    InvalidUtf8,

    #[error("truncated input: {0}")]
    Io(#[from] io::Error),
}

fn kind_tag(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Generic => 0,
        ItemKind::RssFeed => 1,
        ItemKind::RssArticle => 2,
    }
}

fn kind_from_tag(tag: u8) -> Result<ItemKind, WireError> {
    match tag {
        0 => Ok(ItemKind::Generic),
        1 => Ok(ItemKind::RssFeed),
        2 => Ok(ItemKind::RssArticle),
        other => Err(WireError::UnknownKind(other)),
    }
}

/// Serialize a feed.
///
/// The feed is borrowed, not consumed: callers that want the article memory
/// back afterwards call [`Feed::clear_articles`] themselves.
pub fn encode(feed: &Feed, w: &mut impl Write) -> io::Result<()> {
    w.write_all(&[kind_tag(feed.envelope().kind())])?;
    write_pairs(w, feed.envelope(), feed.envelope().len())?;

    w.write_all(&(feed.article_count() as u32).to_le_bytes())?;
    let cap = feed.max_item_data();
    w.write_all(&(cap as u32).to_le_bytes())?;

    for article in feed.articles() {
        w.write_all(&[kind_tag(article.kind())])?;
        write_pairs(w, article, article.len().min(cap))?;
    }
    Ok(())
}

/// Deserialize a feed.
///
/// Never fails: a feed that cannot be reconstructed comes back empty. A
/// damaged article section keeps the envelope fields read so far but drops
/// every article and resets `max_item_data` to zero.
pub fn decode(bytes: &[u8]) -> Feed {
    let mut r = io::Cursor::new(bytes);

    let mut feed = match decode_envelope(&mut r) {
        Ok(feed) => feed,
        Err(e) => {
            tracing::warn!(error = %e, "failed to recover feed envelope from wire data");
            return Feed::default();
        }
    };

    if let Err(e) = decode_articles(&mut r, &mut feed) {
        tracing::warn!(error = %e, "failed to recover feed articles from wire data");
        feed.clear_articles();
        feed.set_max_item_data(0);
    }

    feed
}

fn write_pairs(w: &mut impl Write, item: &FeedItem, count: usize) -> io::Result<()> {
    w.write_all(&(count as u32).to_le_bytes())?;
    for (key, value) in item.fields().take(count) {
        write_string(w, key)?;
        write_string(w, value)?;
    }
    Ok(())
}

fn write_string(w: &mut impl Write, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u32).to_le_bytes())?;
    w.write_all(s.as_bytes())
}

fn decode_envelope(r: &mut impl Read) -> Result<Feed, WireError> {
    let kind = kind_from_tag(read_u8(r)?)?;
    let mut feed = Feed::new(kind);

    let count = read_u32(r)?;
    for _ in 0..count {
        let key = read_string(r)?;
        let value = read_string(r)?;
        feed.set_value(&key, &value);
    }
    Ok(feed)
}

fn decode_articles(r: &mut impl Read, feed: &mut Feed) -> Result<(), WireError> {
    let article_count = read_u32(r)?;
    let max_item_data = read_u32(r)? as usize;

    for _ in 0..article_count {
        let kind = kind_from_tag(read_u8(r)?)?;
        let mut article = FeedItem::new(kind);

        let pair_count = read_u32(r)? as usize;
        for _ in 0..pair_count.min(max_item_data) {
            let key = read_string(r)?;
            let value = read_string(r)?;
            article.set_value(&key, &value);
        }
        feed.add_article(article);
    }

    // Restore the recorded cap: it may exceed what the surviving (truncated)
    // articles would recompute.
    feed.set_max_item_data(max_item_data);
    Ok(())
}

fn read_u8(r: &mut impl Read) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> Result<u32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_string(r: &mut impl Read) -> Result<String, WireError> {
    let len = read_u32(r)? as u64;
    // Read via take() so a corrupt length fails on the missing bytes instead
    // of attempting a multi-gigabyte allocation up front.
    let mut buf = Vec::new();
    let n = r.take(len).read_to_end(&mut buf)?;
    if (n as u64) < len {
        return Err(WireError::Io(io::ErrorKind::UnexpectedEof.into()));
    }
    String::from_utf8(buf).map_err(|_| WireError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rss_article(fields: &[(&str, &str)]) -> FeedItem {
        let mut item = FeedItem::new(ItemKind::Generic);
        for (k, v) in fields {
            item.set_value(k, v);
        }
        item
    }

    fn encode_to_vec(feed: &Feed) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(feed, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_round_trip_preserves_envelope_and_articles() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.set_value("title", "Example Feed");
        feed.set_value("link", "https://example.com");
        feed.add_article(rss_article(&[("title", "First"), ("guid", "1")]));
        feed.add_article(rss_article(&[("title", "Second"), ("guid", "2")]));

        let decoded = decode(&encode_to_vec(&feed));

        assert_eq!(decoded, feed);
    }

    #[test]
    fn test_round_trip_truncates_at_max_item_data() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        // Widest article first fixes the cap at 2...
        feed.add_article(rss_article(&[("a", "1"), ("b", "2")]));
        feed.add_article(rss_article(&[("c", "3")]));

        // ...then the cap is narrowed by hand to force truncation of the
        // first article on write.
        feed.set_max_item_data(1);
        let decoded = decode(&encode_to_vec(&feed));

        assert_eq!(decoded.article_count(), 2);
        // First min(len, cap) fields survive, the rest are dropped silently
        assert_eq!(decoded.article(0).unwrap().value("a"), Some("1"));
        assert_eq!(decoded.article(0).unwrap().value("b"), None);
        assert_eq!(decoded.article(0).unwrap().len(), 1);
        assert_eq!(decoded.article(1).unwrap().value("c"), Some("3"));
    }

    #[test]
    fn test_heterogeneous_sizes_round_trip_under_cap() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.add_article(rss_article(&[("a", "1"), ("b", "2"), ("c", "3")]));
        feed.add_article(rss_article(&[("d", "4")]));

        let decoded = decode(&encode_to_vec(&feed));

        assert_eq!(decoded.max_item_data(), 3);
        assert_eq!(decoded.article(0).unwrap().len(), 3);
        assert_eq!(decoded.article(1).unwrap().len(), 1);
    }

    #[test]
    fn test_kind_survives_round_trip() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        let mut article = FeedItem::new(ItemKind::RssArticle);
        article.set_value("title", "Typed");
        feed.add_article(article);

        let decoded = decode(&encode_to_vec(&feed));

        assert_eq!(decoded.envelope().kind(), ItemKind::RssFeed);
        assert_eq!(decoded.article(0).unwrap().kind(), ItemKind::RssArticle);
    }

    #[test]
    fn test_empty_input_yields_empty_feed() {
        let feed = decode(&[]);
        assert_eq!(feed.article_count(), 0);
        assert!(feed.envelope().is_empty());
    }

    #[test]
    fn test_corrupt_article_section_keeps_envelope_drops_articles() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.set_value("title", "Example Feed");
        feed.add_article(rss_article(&[("title", "First")]));

        let mut bytes = encode_to_vec(&feed);
        // Chop the tail so the article section is truncated mid-read
        bytes.truncate(bytes.len() - 4);

        let decoded = decode(&bytes);
        assert_eq!(decoded.value("title"), Some("Example Feed"));
        assert_eq!(decoded.article_count(), 0);
        assert_eq!(decoded.max_item_data(), 0);
    }

    #[test]
    fn test_unknown_kind_tag_recovers_to_empty_feed() {
        let bytes = [0xFFu8, 0, 0, 0, 0];
        let decoded = decode(&bytes);
        assert_eq!(decoded.article_count(), 0);
        assert!(decoded.envelope().is_empty());
    }

    #[test]
    fn test_corrupt_string_length_does_not_panic() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.set_value("title", "Example Feed");
        let mut bytes = encode_to_vec(&feed);

        // Overwrite the first string length with a huge value
        bytes[5] = 0xFF;
        bytes[6] = 0xFF;
        bytes[7] = 0xFF;
        bytes[8] = 0xFF;

        let decoded = decode(&bytes);
        assert!(decoded.envelope().is_empty());
    }
}
