use std::sync::Arc;

use common_error::{ensure, DaftResult};
use daft_schema::schema::SchemaRef;

use super::{SortDescription, SortSettings};
use crate::{
    pipeline::{ProcessorRef, QueryPipelineBuilder, StreamType},
    transforms::{
        FinishSortingTransform, MergeSortingTransform, MergingSortedTransform,
        PartialSortingTransform,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortMode {
    /// Sort every stream on the whole description, then merge them.
    Full,
    /// Input is already globally ordered by `prefix`; only runs of equal prefix values still
    /// need sorting.
    FinishSorting { prefix: SortDescription },
}

/// Generic sort operator producing a single stream ordered by `result_description`.
#[derive(Debug)]
pub struct SortingStep {
    header: SchemaRef,
    result_description: SortDescription,
    limit: usize,
    settings: SortSettings,
    optimize_sorting_by_input_stream_properties: bool,
    mode: SortMode,
    step_description: Option<String>,
    processors: Vec<ProcessorRef>,
}

impl SortingStep {
    pub fn new(
        header: SchemaRef,
        result_description: SortDescription,
        limit: usize,
        settings: SortSettings,
        optimize_sorting_by_input_stream_properties: bool,
    ) -> Self {
        Self {
            header,
            result_description,
            limit,
            settings,
            optimize_sorting_by_input_stream_properties,
            mode: SortMode::Full,
            step_description: None,
            processors: vec![],
        }
    }

    pub fn convert_to_finish_sorting(&mut self, prefix: SortDescription) {
        self.mode = SortMode::FinishSorting { prefix };
    }

    pub fn sort_mode(&self) -> &SortMode {
        &self.mode
    }

    pub fn result_description(&self) -> &SortDescription {
        &self.result_description
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    pub fn optimize_sorting_by_input_stream_properties(&self) -> bool {
        self.optimize_sorting_by_input_stream_properties
    }

    pub fn set_step_description<S: Into<String>>(&mut self, description: S) {
        self.step_description = Some(description.into());
    }

    pub fn step_description(&self) -> Option<&str> {
        self.step_description.as_deref()
    }

    pub fn processors(&self) -> &[ProcessorRef] {
        &self.processors
    }

    pub fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    pub fn transform_pipeline(&mut self, pipeline: &mut QueryPipelineBuilder) -> DaftResult<()> {
        self.header.ensure_columns(&self.result_description.column_names())?;
        match self.mode.clone() {
            SortMode::Full => self.full_sort(pipeline),
            SortMode::FinishSorting { prefix } => {
                self.header.ensure_columns(&prefix.column_names())?;
                ensure!(
                    self.result_description.has_prefix(&prefix),
                    "Sort prefix [{prefix}] does not lead sort description [{}]",
                    self.result_description
                );
                self.finish_sort(pipeline, prefix)
            }
        }
    }

    fn full_sort(&mut self, pipeline: &mut QueryPipelineBuilder) -> DaftResult<()> {
        let mut created = vec![];
        pipeline.add_simple_transform(|header, stream_type| {
            if stream_type == StreamType::Totals {
                return Ok(None);
            }
            let transform: ProcessorRef = Arc::new(PartialSortingTransform::new(
                header.clone(),
                self.result_description.clone(),
                self.limit,
            ));
            created.push(transform.clone());
            Ok(Some(transform))
        })?;
        pipeline.add_simple_transform(|header, stream_type| {
            if stream_type == StreamType::Totals {
                return Ok(None);
            }
            let transform: ProcessorRef = Arc::new(MergeSortingTransform::new(
                header.clone(),
                self.result_description.clone(),
                self.limit,
                self.settings.clone(),
            ));
            created.push(transform.clone());
            Ok(Some(transform))
        })?;
        self.processors.extend(created);
        self.merge_streams(pipeline, self.result_description.clone());
        Ok(())
    }

    fn finish_sort(
        &mut self,
        pipeline: &mut QueryPipelineBuilder,
        prefix: SortDescription,
    ) -> DaftResult<()> {
        self.merge_streams(pipeline, prefix.clone());

        let mut created = vec![];
        pipeline.add_simple_transform(|header, stream_type| {
            if stream_type == StreamType::Totals {
                return Ok(None);
            }
            let transform: ProcessorRef = Arc::new(FinishSortingTransform::new(
                header.clone(),
                prefix.clone(),
                self.result_description.clone(),
                self.settings.max_block_size,
                self.limit,
            ));
            created.push(transform.clone());
            Ok(Some(transform))
        })?;
        self.processors.extend(created);
        Ok(())
    }

    /// Merges all streams sorted by `description` into one.
    fn merge_streams(&mut self, pipeline: &mut QueryPipelineBuilder, description: SortDescription) {
        if pipeline.num_streams() <= 1 {
            return;
        }
        let transform: ProcessorRef = Arc::new(MergingSortedTransform::new(
            pipeline.header().clone(),
            pipeline.num_streams(),
            description,
            self.settings.max_block_size,
            self.limit,
        ));
        pipeline.add_merging_transform(transform.clone());
        self.processors.push(transform);
    }
}
