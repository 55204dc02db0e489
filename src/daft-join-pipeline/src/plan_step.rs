use std::sync::Arc;

use common_display::{ascii::render_tree, tree::TreeDisplay, DisplayLevel};
use daft_schema::schema::SchemaRef;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    diagnostics::{LogEventSink, PlanEvent, PlanEventSink},
    pipeline::{ProcessorDisplay, ProcessorRef, QueryPipelineBuilder},
    InvalidInputCountSnafu, Result,
};

/// Context handed to every step while it extends a pipeline.
#[derive(Clone, Debug)]
pub struct BuildPipelineSettings {
    event_sink: Arc<dyn PlanEventSink>,
}

impl Default for BuildPipelineSettings {
    fn default() -> Self {
        Self {
            event_sink: Arc::new(LogEventSink),
        }
    }
}

impl BuildPipelineSettings {
    #[must_use]
    pub fn with_event_sink(mut self, event_sink: Arc<dyn PlanEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn record(&self, event: PlanEvent) {
        self.event_sink.record(event);
    }
}

/// Properties of the input data a transforming step keeps intact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTraits {
    pub preserves_distinct_columns: bool,
    pub returns_single_stream: bool,
    pub preserves_number_of_streams: bool,
    pub preserves_sorting: bool,
    pub preserves_number_of_rows: bool,
}

pub trait PlanStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn input_headers(&self) -> &[SchemaRef];

    fn output_header(&self) -> &SchemaRef;

    /// Consumes the upstream pipelines, in input order, and returns the extended pipeline.
    fn update_pipeline(
        &mut self,
        pipelines: Vec<QueryPipelineBuilder>,
        settings: &BuildPipelineSettings,
    ) -> Result<QueryPipelineBuilder>;

    /// Processors created by the last pipeline build, in creation order.
    fn processors(&self) -> &[ProcessorRef];

    fn step_description(&self) -> Option<&str> {
        None
    }

    fn describe_pipeline(&self, level: DisplayLevel) -> String {
        let mut out = String::new();
        if let Some(description) = self.step_description() {
            out.push_str(&format!("{} ({description})\n", self.name()));
        } else {
            out.push_str(&format!("{}\n", self.name()));
        }
        for processor in self.processors() {
            let display = ProcessorDisplay(processor.as_ref());
            match render_tree(&display as &dyn TreeDisplay, level) {
                Ok(rendered) => out.push_str(&rendered),
                Err(e) => log::warn!("Failed to render processor {}: {e}", processor.name()),
            }
        }
        out
    }
}

/// A unary step that extends one pipeline in place.
pub trait TransformingStep: PlanStep {
    fn traits(&self) -> StepTraits;

    fn transform_pipeline(
        &mut self,
        pipeline: &mut QueryPipelineBuilder,
        settings: &BuildPipelineSettings,
    ) -> Result<()>;

    /// Replaces the single input header and refreshes the output header.
    fn update_input_stream(&mut self, header: SchemaRef);

    fn update_output_stream(&mut self);
}

/// Unwraps the only pipeline a unary step accepts.
pub(crate) fn single_pipeline(
    step: &'static str,
    mut pipelines: Vec<QueryPipelineBuilder>,
) -> Result<QueryPipelineBuilder> {
    ensure!(
        pipelines.len() == 1,
        InvalidInputCountSnafu {
            step,
            expected: 1usize,
            actual: pipelines.len(),
        }
    );
    match pipelines.pop() {
        Some(pipeline) => Ok(pipeline),
        None => InvalidInputCountSnafu {
            step,
            expected: 1usize,
            actual: 0usize,
        }
        .fail(),
    }
}
