use std::sync::Arc;

use common_daft_config::DaftExecutionConfig;
use daft_schema::schema::SchemaRef;
use snafu::{ensure, ResultExt};
use tracing::info_span;

use super::SortForJoinStep;
use crate::{
    diagnostics::PlanEvent,
    join::{JoinRef, JoinTableSide, PipelineShape, SortingJoin},
    pipeline::{ProcessorRef, QueryPipelineBuilder},
    plan_step::{BuildPipelineSettings, PlanStep},
    InvalidInputCountSnafu, PipelineCreationSnafu, Result,
};

const STEP_NAME: &str = "JoinStep";

/// Binary step joining a left and a right pipeline through a [`JoinCapability`].
///
/// [`JoinCapability`]: crate::join::JoinCapability
#[derive(Debug)]
pub struct JoinStep {
    input_headers: [SchemaRef; 2],
    output_header: SchemaRef,
    join: JoinRef,
    max_block_size: usize,
    max_streams: usize,
    keep_left_order: bool,
    processors: Vec<ProcessorRef>,
}

impl JoinStep {
    pub fn new(
        left: SchemaRef,
        right: SchemaRef,
        join: JoinRef,
        max_block_size: usize,
        max_streams: usize,
        keep_left_order: bool,
    ) -> Self {
        let output_header = join.merge_header(&left);
        Self {
            input_headers: [left, right],
            output_header,
            join,
            max_block_size,
            max_streams,
            keep_left_order,
            processors: vec![],
        }
    }

    pub fn from_config(
        left: SchemaRef,
        right: SchemaRef,
        join: JoinRef,
        cfg: &DaftExecutionConfig,
    ) -> Self {
        Self::new(
            left,
            right,
            join,
            cfg.max_block_size,
            cfg.max_streams,
            cfg.join_keep_left_read_in_order,
        )
    }

    pub fn join(&self) -> &JoinRef {
        &self.join
    }

    /// The join as a sort-requiring merge join, if its inputs must arrive sorted on the keys.
    pub fn sorting_join(&self) -> Option<Arc<dyn SortingJoin>> {
        self.join.clone().as_sorting_join()
    }

    /// Whether predicates may be pushed into the right subtree. Only safe when both sides are
    /// consumed incrementally.
    pub fn allow_push_down_to_right(&self) -> bool {
        self.join.pipeline_shape() == PipelineShape::StreamingMerge
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn max_streams(&self) -> usize {
        self.max_streams
    }

    pub fn keep_left_order(&self) -> bool {
        self.keep_left_order
    }

    /// Replaces the header of one input. Only a new left header changes the output header, as
    /// the join derives its output from the left side alone.
    pub fn update_input_stream(&mut self, header: SchemaRef, side: JoinTableSide) {
        match side {
            JoinTableSide::Left => {
                self.output_header = self.join.merge_header(&header);
                self.input_headers[0] = header;
            }
            JoinTableSide::Right => self.input_headers[1] = header,
        }
    }

    /// The sort steps a merge join needs below each of its inputs, left first. `None` when the
    /// join accepts unsorted input.
    pub fn sort_for_join_steps(&self) -> Option<[SortForJoinStep; 2]> {
        let sorting_join = self.sorting_join()?;
        let [left, right] = self.input_headers.clone();
        Some([
            SortForJoinStep::new(left, sorting_join.clone(), JoinTableSide::Left),
            SortForJoinStep::new(right, sorting_join, JoinTableSide::Right),
        ])
    }

    pub fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!("Join: {}", self.join.name())];
        res.extend(self.join.multiline_display().into_iter().skip(1));
        res.push(format!("Max block size = {}", self.max_block_size));
        res.push(format!("Max streams = {}", self.max_streams));
        if self.keep_left_order {
            res.push("Keep left read in order = true".to_string());
        }
        res.push(format!("Output schema = {}", self.output_header));
        res
    }

    pub fn repr_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": STEP_NAME,
            "join": self.join.name(),
            "shape": self.join.pipeline_shape(),
            "left_on": self.join.key_names(JoinTableSide::Left),
            "right_on": self.join.key_names(JoinTableSide::Right),
            "max_block_size": self.max_block_size,
            "max_streams": self.max_streams,
            "keep_left_order": self.keep_left_order,
            "output": self.output_header.names(),
        })
    }
}

impl PlanStep for JoinStep {
    fn name(&self) -> &'static str {
        STEP_NAME
    }

    fn input_headers(&self) -> &[SchemaRef] {
        &self.input_headers
    }

    fn output_header(&self) -> &SchemaRef {
        &self.output_header
    }

    fn update_pipeline(
        &mut self,
        pipelines: Vec<QueryPipelineBuilder>,
        settings: &BuildPipelineSettings,
    ) -> Result<QueryPipelineBuilder> {
        let shape = self.join.pipeline_shape();
        let _span = info_span!("JoinStep::update_pipeline", %shape).entered();
        ensure!(
            pipelines.len() == 2,
            InvalidInputCountSnafu {
                step: STEP_NAME,
                expected: 2usize,
                actual: pipelines.len(),
            }
        );
        let mut pipelines = pipelines.into_iter();
        let (Some(left), Some(right)) = (pipelines.next(), pipelines.next()) else {
            return InvalidInputCountSnafu {
                step: STEP_NAME,
                expected: 2usize,
                actual: 0usize,
            }
            .fail();
        };

        self.processors.clear();
        let joined = match shape {
            PipelineShape::StreamingMerge => {
                let mut joined = QueryPipelineBuilder::join_pipelines_streaming_merge(
                    left,
                    right,
                    self.join.clone(),
                    self.output_header.clone(),
                    self.max_block_size,
                    &mut self.processors,
                )
                .context(PipelineCreationSnafu { step: STEP_NAME })?;
                let resize = joined
                    .resize(self.max_streams)
                    .context(PipelineCreationSnafu { step: STEP_NAME })?;
                self.processors.extend(resize);
                joined
            }
            PipelineShape::BuildThenProbe => QueryPipelineBuilder::join_pipelines_build_probe(
                left,
                right,
                self.join.clone(),
                self.output_header.clone(),
                self.max_block_size,
                self.max_streams,
                self.keep_left_order,
                &mut self.processors,
            )
            .context(PipelineCreationSnafu { step: STEP_NAME })?,
        };

        settings.record(PlanEvent::JoinComposed {
            shape,
            output_streams: joined.num_streams(),
            processors: self.processors.len(),
        });
        Ok(joined)
    }

    fn processors(&self) -> &[ProcessorRef] {
        &self.processors
    }
}
