//! Impls - ports の実装
//!
//! - **success_store**: in-memory / JSON file success state
//! - **endpoint_pool**: run-wide cached endpoint pool
//! - **catalog**: offline JSON catalog backend for every external port

pub(crate) mod fs;

pub mod catalog;
pub mod endpoint_pool;
pub mod success_store;

pub use self::catalog::{Catalog, CatalogBackend};
pub use self::endpoint_pool::CachedEndpointPool;
pub use self::success_store::{InMemorySuccessStore, JsonFileSuccessStore};
