//! Upstream access: snapshot endpoints, order-details enrichment and the
//! wire payload shapes.

mod details;
mod http;
pub mod models;

pub use details::DetailsCache;
pub use http::{ClientError, DetailsSource, SnapshotClient, SnapshotSource};
