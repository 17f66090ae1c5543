//! Network-subsystem error types.

use thiserror::Error;

use bd_core::NodeId;

/// Errors produced while building or loading a network.
///
/// Every variant except `Io` and `Csv` means the input network is malformed;
/// see [`NetworkError::is_malformed`].  All of them are fatal and abort a run
/// before any solving starts.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("malformed network: edge {edge} references missing node {node}")]
    DanglingEdge { edge: usize, node: NodeId },

    #[error("malformed network: edge {edge} has invalid cost {cost}")]
    InvalidCost { edge: usize, cost: f64 },

    #[error("malformed network: {0}")]
    Malformed(String),

    #[error("invalid input data: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl NetworkError {
    /// `true` for the graph-structure variants (dangling edge, bad cost, …).
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            NetworkError::DanglingEdge { .. }
                | NetworkError::InvalidCost { .. }
                | NetworkError::Malformed(_)
        )
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Internal failures of a single shortest-path call.
///
/// `Unreachable` is deliberately absent: it is a normal
/// [`PathOutcome`](crate::PathOutcome), not an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("origin node {0} is not in the network")]
    OriginNotFound(NodeId),

    #[error("target node {0} is not in the network")]
    TargetNotFound(NodeId),

    #[error("empty target set")]
    NoTargets,
}

pub type SolverResult<T> = Result<T, SolverError>;
