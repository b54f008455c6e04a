use thiserror::Error;

use crate::factory::{FactoryId, SlotId};
use crate::job::{JobId, JobStatus, TemplateId};
use crate::resource::ResourceError;
use crate::temporal::TemporalError;

/// Broad category of a [`PlanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input; nothing was changed.
    InvalidArgument,
    /// The operation is not allowed in the current state.
    InvalidState,
    /// The scheduler could not produce a plan.
    Infeasible,
    /// An engine invariant was found broken.
    Internal,
    /// The operation is undefined for the given value.
    Unsupported,
    Io,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("dependency cycle detected between {templates:?}")]
    CyclicDependency { templates: Vec<TemplateId> },

    #[error("unable to allocate slot for template '{template}'")]
    NoSlotAvailable { template: String },

    #[error("{template} depends on {dependency}, which has no scheduled job")]
    UnresolvedDependency {
        template: TemplateId,
        dependency: TemplateId,
    },

    #[error("unknown template {0}")]
    UnknownTemplate(TemplateId),

    #[error("unknown factory {0}")]
    UnknownFactory(FactoryId),

    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),

    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("internal consistency violation: {0}")]
    Internal(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::InvalidArgument(_)
            | PlanError::UnknownFactory(_)
            | PlanError::UnknownSlot(_)
            | PlanError::UnknownJob(_) => ErrorKind::InvalidArgument,
            PlanError::InvalidTransition { .. } | PlanError::InvalidState(_) => {
                ErrorKind::InvalidState
            }
            PlanError::CyclicDependency { .. }
            | PlanError::NoSlotAvailable { .. }
            | PlanError::UnresolvedDependency { .. }
            | PlanError::UnknownTemplate(_) => ErrorKind::Infeasible,
            PlanError::Internal(_) => ErrorKind::Internal,
            PlanError::Unsupported(_) => ErrorKind::Unsupported,
            PlanError::Resource(ResourceError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            PlanError::Resource(ResourceError::Unsupported(_)) => ErrorKind::Unsupported,
            PlanError::Csv(_) | PlanError::Json(_) | PlanError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<TemporalError> for PlanError {
    fn from(value: TemporalError) -> Self {
        match value {
            TemporalError::InvalidArgument(message) => PlanError::InvalidArgument(message),
            TemporalError::Unsupported(message) => PlanError::Unsupported(message),
        }
    }
}
