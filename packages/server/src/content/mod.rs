//! Articles, their slugs, search index and publication lifecycle.

pub mod lifecycle;
pub mod present;
pub mod search;
pub mod service;
pub mod slug;

pub use service::{ArticlePage, ArticleService, Written};
