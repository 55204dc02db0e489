use std::sync::Arc;

use daft_schema::schema::SchemaRef;
use itertools::Itertools;
use snafu::ResultExt;
use tracing::info_span;

use crate::{
    diagnostics::PlanEvent,
    join::{JoinTableSide, SortingJoin},
    pipeline::{ProcessorRef, QueryPipelineBuilder},
    plan_step::{single_pipeline, BuildPipelineSettings, PlanStep, StepTraits, TransformingStep},
    sorting::{SortColumn, SortDescription, SortMode, SortingStep},
    PipelineCreationSnafu, Result, TransformedTwiceSnafu,
};

const STEP_NAME: &str = "SortForJoinStep";

/// Ascending sort on `keys` in their given order, keeping only the first occurrence of a
/// repeated key.
pub fn sort_description_for_keys<S: AsRef<str>>(keys: &[S]) -> SortDescription {
    keys.iter()
        .map(|key| key.as_ref())
        .unique()
        .map(SortColumn::ascending)
        .collect()
}

#[derive(Debug)]
enum SortingState {
    NotBuilt,
    Built(SortingStep),
}

/// Sorts one input of a merge join on that side's join keys.
#[derive(Debug)]
pub struct SortForJoinStep {
    input_headers: [SchemaRef; 1],
    output_header: SchemaRef,
    join: Arc<dyn SortingJoin>,
    side: JoinTableSide,
    state: SortingState,
    step_description: Option<String>,
}

impl SortForJoinStep {
    pub fn new(input_header: SchemaRef, join: Arc<dyn SortingJoin>, side: JoinTableSide) -> Self {
        Self {
            output_header: input_header.clone(),
            input_headers: [input_header],
            join,
            side,
            state: SortingState::NotBuilt,
            step_description: None,
        }
    }

    pub fn side(&self) -> JoinTableSide {
        self.side
    }

    /// The sort operator this step delegated to, once the pipeline has been built.
    pub fn sorting_step(&self) -> Option<&SortingStep> {
        match &self.state {
            SortingState::NotBuilt => None,
            SortingState::Built(sorting) => Some(sorting),
        }
    }

    pub fn sort_mode(&self) -> Option<&SortMode> {
        self.sorting_step().map(SortingStep::sort_mode)
    }
}

impl PlanStep for SortForJoinStep {
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
        let mut pipeline = single_pipeline(STEP_NAME, pipelines)?;
        self.transform_pipeline(&mut pipeline, settings)?;
        Ok(pipeline)
    }

    fn processors(&self) -> &[ProcessorRef] {
        match &self.state {
            SortingState::NotBuilt => &[],
            SortingState::Built(sorting) => sorting.processors(),
        }
    }

    fn step_description(&self) -> Option<&str> {
        self.step_description.as_deref()
    }
}

impl TransformingStep for SortForJoinStep {
    fn traits(&self) -> StepTraits {
        StepTraits {
            preserves_distinct_columns: true,
            returns_single_stream: true,
            preserves_number_of_streams: false,
            preserves_sorting: false,
            preserves_number_of_rows: true,
        }
    }

    fn transform_pipeline(
        &mut self,
        pipeline: &mut QueryPipelineBuilder,
        settings: &BuildPipelineSettings,
    ) -> Result<()> {
        let _span = info_span!("SortForJoinStep::transform_pipeline", side = %self.side).entered();
        if let SortingState::Built(_) = self.state {
            return TransformedTwiceSnafu { step: STEP_NAME }.fail();
        }

        let [input_header] = &self.input_headers;
        let keys = self.join.key_names(self.side);
        let sort_description = sort_description_for_keys(keys.as_slice());
        let mut sorting = SortingStep::new(
            input_header.clone(),
            sort_description.clone(),
            0,
            self.join.sort_settings(),
            false,
        );

        let prefix_sort_description = self.join.prefix_sort_description(self.side);
        if !prefix_sort_description.is_empty() {
            sorting.convert_to_finish_sorting(prefix_sort_description.clone());
        }
        settings.record(PlanEvent::SortForJoin {
            side: self.side,
            sort_description,
            prefix_sort_description,
            mode: sorting.sort_mode().into(),
        });

        sorting.set_step_description("Sorting for JOIN");
        self.step_description = Some(format!("Sorting for {} side of JOIN", self.side));

        let result = sorting
            .transform_pipeline(pipeline)
            .context(PipelineCreationSnafu { step: STEP_NAME });
        self.state = SortingState::Built(sorting);
        result
    }

    fn update_input_stream(&mut self, header: SchemaRef) {
        self.input_headers = [header];
        self.update_output_stream();
    }

    fn update_output_stream(&mut self) {
        let [input_header] = &self.input_headers;
        self.output_header = input_header.clone();
    }
}
