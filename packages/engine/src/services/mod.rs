pub mod calibration;
pub mod irt;
pub mod locks;
pub mod progression;
pub mod recompute;
pub mod responses;
pub mod transfer;

use mastery_algo::{MasteryError, ValidationError};

use crate::graph::GraphError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid response: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Mastery(#[from] MasteryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("batch already running for scope {0}")]
    BatchInFlight(String),
}
