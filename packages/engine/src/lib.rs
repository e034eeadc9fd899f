//! # mastery-engine
//!
//! Runtime around `mastery-algo`: per-key serialized response processing,
//! batch recomputation, IRT batches, transfer and progression queries over a
//! pluggable record store and graph service.

pub mod config;
pub mod graph;
pub mod logging;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod workers;

pub use config::{Config, OrderingPolicy};
pub use graph::{GraphError, GraphService, MemoryGraph};
pub use services::EngineError;
pub use state::AppState;
pub use store::{MemoryStore, RecordStore, StoreError};
