//! # Adapters Layer
//!
//! - `api_handler`: JSON method dispatcher for hosts and gateways
//! - `rocksdb_adapter`: persistent tables (feature `rocksdb`)

pub mod api_handler;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

pub use api_handler::{handle_api_query, ApiGatewayHandler, ApiQueryError};
#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{open_catalog, RocksDbConfig, RocksDbStore, RocksDbTable};
