//! Bubbla news core
//!
//! Data access and reconciliation for the Bubbla news reader:
//! - Feed fetching and tolerant decoding into `NewsItem`s
//! - Category grouping and news-source distribution
//! - Push-topic subscription reconciliation against SNS
//! - Incrementally filtered lists for search

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod http_client;
pub mod metrics;
pub mod notifications;
pub mod reconciler;
pub mod schemas;
pub mod searchable_list;
pub mod value_count;

pub use api::BubblaApi;
pub use error::{BubblaError, Result};
pub use searchable_list::{Searchable, SearchableList};
pub use value_count::ValueCount;
