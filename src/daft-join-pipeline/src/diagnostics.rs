use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    join::{JoinTableSide, PipelineShape},
    sorting::{SortDescription, SortMode},
};

/// Structured fact produced while lowering a join into a pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlanEvent {
    SortForJoin {
        side: JoinTableSide,
        sort_description: SortDescription,
        prefix_sort_description: SortDescription,
        mode: SortEventMode,
    },
    JoinComposed {
        shape: PipelineShape,
        output_streams: usize,
        processors: usize,
    },
    FilledJoinAttached {
        data_streams: usize,
        default_totals: bool,
        has_totals_row: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortEventMode {
    Full,
    FinishSorting,
}

impl From<&SortMode> for SortEventMode {
    fn from(mode: &SortMode) -> Self {
        match mode {
            SortMode::Full => Self::Full,
            SortMode::FinishSorting { .. } => Self::FinishSorting,
        }
    }
}

impl PlanEvent {
    pub fn is_finish_sort(&self) -> bool {
        matches!(
            self,
            Self::SortForJoin {
                mode: SortEventMode::FinishSorting,
                ..
            }
        )
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SortForJoin {
                side,
                sort_description,
                prefix_sort_description,
                mode: SortEventMode::FinishSorting,
            } => write!(
                f,
                "Finish sort {side} side of JOIN by [{sort_description}] with prefix [{prefix_sort_description}]"
            ),
            Self::SortForJoin {
                side,
                sort_description,
                ..
            } => write!(f, "Sort {side} side of JOIN by [{sort_description}]"),
            Self::JoinComposed {
                shape,
                output_streams,
                processors,
            } => write!(
                f,
                "Composed {shape} join into {output_streams} streams with {processors} processors"
            ),
            Self::FilledJoinAttached {
                data_streams,
                default_totals,
                has_totals_row,
            } => write!(
                f,
                "Attached filled join to {data_streams} streams (default totals: {default_totals}, totals row: {has_totals_row})"
            ),
        }
    }
}

/// Receiver for [`PlanEvent`]s. Installed by whoever owns the process-wide observability setup.
pub trait PlanEventSink: Send + Sync + fmt::Debug {
    fn record(&self, event: PlanEvent);
}

/// Forwards every event to the `log` facade at debug level.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl PlanEventSink for LogEventSink {
    fn record(&self, event: PlanEvent) {
        log::debug!("{event}");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<PlanEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlanEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl PlanEventSink for CollectingEventSink {
    fn record(&self, event: PlanEvent) {
        self.events.lock().push(event);
    }
}
