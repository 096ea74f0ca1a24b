//! Error types for the clustering pipeline.

use thiserror::Error;

use crate::scene::SourceId;

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Failure reported by the host while answering a query
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    /// A batched property or visibility query rejected; the whole run fails
    #[error("query failed for {scene}: {cause}")]
    Query {
        scene: SourceId,
        #[source]
        cause: HostError,
    },

    #[error("unknown scene source: {0}")]
    UnknownSource(SourceId),

    #[error("unknown animation state: {0}")]
    UnknownState(String),

    #[error("layout is missing {missing} classified shapes")]
    IncompleteLayout { missing: usize },
}

impl ClusterError {
    #[must_use]
    pub fn query(scene: SourceId, cause: HostError) -> Self {
        Self::Query { scene, cause }
    }
}
