//! Domain model for the news core
//!
//! Value types are rebuilt on every fetch; none of them carries identity
//! across requests.

pub mod distribution;
pub mod news_item;
pub mod news_source;
pub mod topic;

pub use distribution::*;
pub use news_item::*;
pub use news_source::*;
pub use topic::*;
