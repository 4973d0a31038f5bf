//! Feed data model and its wire representation.
//!
//! [`FeedItem`] is an ordered field record with an [`ItemKind`] vocabulary;
//! [`Feed`] owns the envelope item plus the article list. The [`wire`]
//! submodule holds the boundary-crossing byte format with its per-article
//! field cap.

mod item;
pub mod wire;

pub use item::{Feed, FeedItem, ItemKind};
