//! Lowering of plan-level JOIN steps into executable processor pipelines.
//!
//! A [`JoinStep`] dispatches to a streaming-merge or build-then-probe composition depending on
//! the shape of its [`JoinCapability`]. A [`FilledJoinStep`] probes an already materialized join
//! table from every stream of a single pipeline and releases the join's totals row once, through
//! a shared [`FinishCounter`]. A [`SortForJoinStep`] prepares one side of a merge join by
//! sorting (or finish-sorting) it on the join keys.

mod diagnostics;
pub mod join;
pub mod pipeline;
mod plan_step;
pub mod sorting;
mod steps;
pub mod transforms;

use common_error::DaftError;
pub use diagnostics::{
    CollectingEventSink, LogEventSink, PlanEvent, PlanEventSink, SortEventMode,
};
pub use join::{
    FullSortingMergeJoin, HashJoin, JoinCapability, JoinRef, JoinTableSide, LiteralValue,
    PipelineShape, SortingJoin, TableJoin, TotalsRow,
};
pub use pipeline::{QueryPipelineBuilder, StreamType};
pub use plan_step::{BuildPipelineSettings, PlanStep, StepTraits, TransformingStep};
use snafu::Snafu;
pub use steps::{sort_description_for_keys, FilledJoinStep, JoinStep, SortForJoinStep};
pub use transforms::FinishCounter;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{step} expects {expected} input pipelines, got {actual}"))]
    InvalidInputCount {
        step: &'static str,
        expected: usize,
        actual: usize,
    },
    #[snafu(display("{step}::transform_pipeline called twice"))]
    TransformedTwice { step: &'static str },
    #[snafu(display("{step} expects join {join} to be filled"))]
    JoinNotFilled { step: &'static str, join: String },
    #[snafu(display("Invalid join key permutation: {reason}"))]
    InvalidPermutation { reason: String },
    #[snafu(display("Error creating pipeline for {step}: {source}"))]
    PipelineCreation {
        source: DaftError,
        step: &'static str,
    },
}

/// Coarse classification of [`Error`]. Every kind aborts the current compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A step was assembled against a join in the wrong state.
    Configuration,
    /// The planner broke a structural contract, e.g. built a step twice.
    InvariantViolation,
    /// A pipeline collaborator rejected an operation.
    Pipeline,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::JoinNotFilled { .. } => ErrorKind::Configuration,
            Self::InvalidInputCount { .. }
            | Self::TransformedTwice { .. }
            | Self::InvalidPermutation { .. } => ErrorKind::InvariantViolation,
            Self::PipelineCreation { .. } => ErrorKind::Pipeline,
        }
    }
}

impl From<Error> for DaftError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::Configuration => Self::ConfigurationError(err.to_string()),
            ErrorKind::InvariantViolation => Self::InternalError(err.to_string()),
            ErrorKind::Pipeline => match err {
                Error::PipelineCreation { source, step } => {
                    log::error!("Error creating pipeline for {}", step);
                    source
                }
                other => Self::External(other.into()),
            },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use common_error::DaftError;

    use super::{Error, ErrorKind};

    #[test]
    fn errors_map_onto_daft_errors() {
        let err = Error::JoinNotFilled {
            step: "FilledJoinStep",
            join: "HashJoin".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            DaftError::from(err),
            DaftError::ConfigurationError(msg) if msg == "FilledJoinStep expects join HashJoin to be filled"
        ));

        let err = Error::TransformedTwice {
            step: "SortForJoinStep",
        };
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert!(DaftError::from(err).is_internal());

        let err = Error::PipelineCreation {
            source: DaftError::ValueError("no streams".to_string()),
            step: "JoinStep",
        };
        assert!(matches!(DaftError::from(err), DaftError::ValueError(msg) if msg == "no streams"));
    }
}
