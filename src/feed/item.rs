//! Feed data model: ordered key/value items and the feed that owns them.
//!
//! A [`FeedItem`] is an ordered record of string fields, one per article (or
//! one for the feed envelope itself). Which keys an item accepts is decided
//! by its [`ItemKind`] vocabulary, so a parser for a given dialect can only
//! store fields that dialect defines.

/// Vocabulary discriminant for a [`FeedItem`].
///
/// This is the closed set of item shapes the crate knows how to build and
/// reconstruct from the wire format. Each kind owns its key vocabulary:
/// which keys are permitted, which are restricted outright, and which are
/// list-valued (repeat occurrences join into one stored string).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// No vocabulary: every key permitted, none restricted or list-valued.
    Generic,
    /// Feed-envelope fields for the RSS/Atom dialect.
    RssFeed,
    /// Per-article fields for the RSS/Atom dialect.
    RssArticle,
}

const RSS_FEED_KEYS: &[&str] = &[
    "title",
    "link",
    "description",
    "updated",
    "language",
    "generator",
    "category",
];

const RSS_ARTICLE_KEYS: &[&str] = &[
    "title",
    "link",
    "guid",
    "published",
    "author",
    "summary",
    "category",
];

/// Structural element names that must never be stored as fields.
const RSS_RESTRICTED_KEYS: &[&str] = &["rss", "channel", "item", "entry"];

impl ItemKind {
    fn is_key_permitted(self, key: &str) -> bool {
        match self {
            ItemKind::Generic => true,
            ItemKind::RssFeed => RSS_FEED_KEYS.contains(&key),
            ItemKind::RssArticle => RSS_ARTICLE_KEYS.contains(&key),
        }
    }

    fn is_key_restricted(self, key: &str) -> bool {
        match self {
            ItemKind::Generic => false,
            ItemKind::RssFeed | ItemKind::RssArticle => RSS_RESTRICTED_KEYS.contains(&key),
        }
    }

    fn is_key_list_value(self, key: &str) -> bool {
        match self {
            ItemKind::Generic => false,
            ItemKind::RssFeed | ItemKind::RssArticle => key == "category",
        }
    }

    /// Join rule for list-valued keys.
    fn join_list_value(self, existing: &str, new: &str) -> String {
        format!("{existing}, {new}")
    }
}

/// One article, or the feed envelope: an ordered field record.
///
/// Fields keep insertion order, which the wire format relies on. A key that
/// the item's [`ItemKind`] rejects is silently dropped by [`set_value`];
/// lookups for unknown keys return `None` rather than failing.
///
/// [`set_value`]: FeedItem::set_value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    kind: ItemKind,
    fields: Vec<(String, String)>,
}

impl FeedItem {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Store a field.
    ///
    /// Rejected keys (not permitted by the vocabulary, or restricted) are a
    /// silent no-op. A list-valued key that already has a value appends via
    /// the kind's join rule; any other existing key is overwritten in place.
    pub fn set_value(&mut self, key: &str, value: &str) {
        if !self.kind.is_key_permitted(key) || self.kind.is_key_restricted(key) {
            return;
        }

        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            if self.kind.is_key_list_value(key) {
                slot.1 = self.kind.join_list_value(&slot.1, value);
            } else {
                slot.1 = value.to_string();
            }
            return;
        }

        self.fields.push((key.to_string(), value.to_string()));
    }

    /// Look up a stored field. Unknown keys are `None`, never an error.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of populated fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ordered read-only view of the fields, for serialization and display.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A parsed feed: envelope fields plus an append-only article list.
///
/// `max_item_data` tracks the largest per-article field count seen across
/// [`add_article`] calls. It only grows — clearing the article list does not
/// reset it — and the wire format uses it as the per-article field cap.
///
/// [`add_article`]: Feed::add_article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    envelope: FeedItem,
    articles: Vec<FeedItem>,
    max_item_data: usize,
}

impl Feed {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            envelope: FeedItem::new(kind),
            articles: Vec::new(),
            max_item_data: 0,
        }
    }

    /// Store an envelope-level field (same rules as [`FeedItem::set_value`]).
    pub fn set_value(&mut self, key: &str, value: &str) {
        self.envelope.set_value(key, value);
    }

    /// Look up an envelope-level field.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.envelope.value(key)
    }

    pub fn envelope(&self) -> &FeedItem {
        &self.envelope
    }

    /// Append an article, growing `max_item_data` to its field count if
    /// larger. Insertion order is preserved.
    pub fn add_article(&mut self, article: FeedItem) {
        tracing::trace!(title = article.value("title").unwrap_or(""), "adding article");
        self.max_item_data = self.max_item_data.max(article.len());
        self.articles.push(article);
    }

    /// Bounds-checked article access; out of range is `None`, not a panic.
    pub fn article(&self, index: usize) -> Option<&FeedItem> {
        self.articles.get(index)
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    pub fn articles(&self) -> impl Iterator<Item = &FeedItem> {
        self.articles.iter()
    }

    /// Empty the article list. `max_item_data` is deliberately left alone:
    /// it describes the widest article this feed has ever held.
    pub fn clear_articles(&mut self) {
        self.articles.clear();
    }

    pub fn max_item_data(&self) -> usize {
        self.max_item_data
    }

    /// Restore the cap recorded on the wire. Decode-only.
    pub(crate) fn set_max_item_data(&mut self, max_item_data: usize) {
        self.max_item_data = max_item_data;
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new(ItemKind::Generic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article_with_fields(n: usize) -> FeedItem {
        let mut item = FeedItem::new(ItemKind::Generic);
        for i in 0..n {
            item.set_value(&format!("key{i}"), &format!("value{i}"));
        }
        item
    }

    #[test]
    fn test_set_value_preserves_insertion_order() {
        let mut item = FeedItem::new(ItemKind::RssArticle);
        item.set_value("guid", "abc");
        item.set_value("title", "Hello");
        item.set_value("link", "https://example.com/1");

        let keys: Vec<&str> = item.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["guid", "title", "link"]);
    }

    #[test]
    fn test_set_value_overwrites_in_place() {
        let mut item = FeedItem::new(ItemKind::RssArticle);
        item.set_value("title", "Old");
        item.set_value("link", "https://example.com/1");
        item.set_value("title", "New");

        assert_eq!(item.value("title"), Some("New"));
        assert_eq!(item.len(), 2);
        // Overwrite keeps the original position
        let keys: Vec<&str> = item.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["title", "link"]);
    }

    #[test]
    fn test_restricted_key_is_silent_noop() {
        let mut item = FeedItem::new(ItemKind::RssArticle);
        assert_eq!(item.value("item"), None);

        item.set_value("item", "should not stick");

        assert_eq!(item.value("item"), None);
        assert_eq!(item.len(), 0);
    }

    #[test]
    fn test_unpermitted_key_is_silent_noop() {
        let mut item = FeedItem::new(ItemKind::RssArticle);
        item.set_value("x-custom-extension", "value");
        assert_eq!(item.value("x-custom-extension"), None);
        assert!(item.is_empty());
    }

    #[test]
    fn test_list_valued_key_joins() {
        let mut item = FeedItem::new(ItemKind::RssArticle);
        item.set_value("category", "rust");
        item.set_value("category", "feeds");

        assert_eq!(item.value("category"), Some("rust, feeds"));
        assert_eq!(item.len(), 1);
    }

    #[test]
    fn test_generic_kind_accepts_anything() {
        let mut item = FeedItem::new(ItemKind::Generic);
        item.set_value("whatever", "goes");
        assert_eq!(item.value("whatever"), Some("goes"));
    }

    #[test]
    fn test_add_article_tracks_max_item_data() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.add_article(article_with_fields(3));
        feed.add_article(article_with_fields(5));
        feed.add_article(article_with_fields(2));

        assert_eq!(feed.max_item_data(), 5);
        assert_eq!(feed.article_count(), 3);
        // Insertion order preserved
        assert_eq!(feed.article(0).unwrap().len(), 3);
        assert_eq!(feed.article(1).unwrap().len(), 5);
        assert_eq!(feed.article(2).unwrap().len(), 2);
    }

    #[test]
    fn test_article_out_of_range_is_none() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.add_article(article_with_fields(1));

        assert!(feed.article(0).is_some());
        assert!(feed.article(1).is_none());
        assert!(feed.article(usize::MAX).is_none());
    }

    #[test]
    fn test_clear_articles_keeps_max_item_data() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.add_article(article_with_fields(4));
        feed.clear_articles();

        assert_eq!(feed.article_count(), 0);
        assert_eq!(feed.max_item_data(), 4);
    }

    #[test]
    fn test_envelope_fields_delegate() {
        let mut feed = Feed::new(ItemKind::RssFeed);
        feed.set_value("title", "Example Feed");
        feed.set_value("item", "restricted");

        assert_eq!(feed.value("title"), Some("Example Feed"));
        assert_eq!(feed.value("item"), None);
        assert_eq!(feed.envelope().len(), 1);
    }
}
