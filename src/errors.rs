//! Typed error hierarchy for the lead pipeline board.
//!
//! `PipelineError` covers every failure the board can observe. Only the
//! reconciler and the board facade ever see repository failures; the state
//! model and the drag controller are infallible.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::models::LeadId;

/// Errors from the pipeline board and its collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Drop target resolves to no known column or card. Treated as a no-op.
    #[error("Drop target '{target}' is not a known column or card")]
    InvalidDragTarget { target: String },

    #[error("Status change for lead {lead_id} failed: {reason}")]
    StatusMutationFailed { lead_id: LeadId, reason: String },

    #[error("Status change for lead {lead_id} timed out after {after:?}")]
    StatusMutationTimedOut { lead_id: LeadId, after: Duration },

    #[error("Failed to record activity for lead {lead_id}: {source}")]
    AuditAppendFailed {
        lead_id: LeadId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Lead repository unavailable: {0}")]
    RepositoryUnavailable(#[source] anyhow::Error),

    #[error("Lead {id} not found")]
    LeadNotFound { id: LeadId },

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Invalid quick action '{0}'")]
    InvalidQuickAction(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether this failure takes the revert path of the reconciler.
    pub fn is_mutation_failure(&self) -> bool {
        matches!(
            self,
            Self::StatusMutationFailed { .. } | Self::StatusMutationTimedOut { .. }
        )
    }
}
