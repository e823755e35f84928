//! Remote side of the federated record resolution engine: per-store
//! authenticated HTTP access, vendor payload normalization, and the tiered
//! search planner that walks stores and endpoint strategies in order.

pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod planner;
pub mod progress;
pub mod window;

pub use client::{HttpWarehouseClient, WarehouseApi, CLIENT_ID_HEADER};
pub use config::{FederationConfig, StoreAccount};
pub use error::{FetchError, Result};
pub use planner::{SearchPlanner, SEARCH_PAGE_SIZE};
pub use progress::{ProgressReporter, SilentReporter};
pub use window::{DateWindow, HISTORICAL_WINDOW_DAYS, RECENT_WINDOW_DAYS};
