use std::any::Any;

use daft_schema::schema::SchemaRef;

use crate::{
    pipeline::Processor,
    sorting::{SortDescription, SortSettings},
};

/// Sorts each block of one stream on its own.
#[derive(Debug)]
pub struct PartialSortingTransform {
    header: SchemaRef,
    description: SortDescription,
    limit: usize,
}

impl PartialSortingTransform {
    pub fn new(header: SchemaRef, description: SortDescription, limit: usize) -> Self {
        Self {
            header,
            description,
            limit,
        }
    }

    pub fn description(&self) -> &SortDescription {
        &self.description
    }
}

impl Processor for PartialSortingTransform {
    fn name(&self) -> &'static str {
        "PartialSortingTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!("PartialSortingTransform: By = {}", self.description)];
        if self.limit > 0 {
            res.push(format!("Limit = {}", self.limit));
        }
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Merges the sorted blocks of one stream into a fully sorted stream, spilling to disk when the
/// settings allow it.
#[derive(Debug)]
pub struct MergeSortingTransform {
    header: SchemaRef,
    description: SortDescription,
    limit: usize,
    settings: SortSettings,
}

impl MergeSortingTransform {
    pub fn new(
        header: SchemaRef,
        description: SortDescription,
        limit: usize,
        settings: SortSettings,
    ) -> Self {
        Self {
            header,
            description,
            limit,
            settings,
        }
    }

    pub fn description(&self) -> &SortDescription {
        &self.description
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }
}

impl Processor for MergeSortingTransform {
    fn name(&self) -> &'static str {
        "MergeSortingTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!("MergeSortingTransform: By = {}", self.description)];
        if self.limit > 0 {
            res.push(format!("Limit = {}", self.limit));
        }
        res.extend(self.settings.multiline_display());
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Merges several streams, each sorted by `description`, into one sorted stream.
#[derive(Debug)]
pub struct MergingSortedTransform {
    header: SchemaRef,
    num_inputs: usize,
    description: SortDescription,
    max_block_size: usize,
    limit: usize,
}

impl MergingSortedTransform {
    pub fn new(
        header: SchemaRef,
        num_inputs: usize,
        description: SortDescription,
        max_block_size: usize,
        limit: usize,
    ) -> Self {
        Self {
            header,
            num_inputs,
            description,
            max_block_size,
            limit,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn description(&self) -> &SortDescription {
        &self.description
    }
}

impl Processor for MergingSortedTransform {
    fn name(&self) -> &'static str {
        "MergingSortedTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!(
            "MergingSortedTransform: {} inputs by {}",
            self.num_inputs, self.description
        )];
        res.push(format!("Max block size = {}", self.max_block_size));
        if self.limit > 0 {
            res.push(format!("Limit = {}", self.limit));
        }
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Completes the sort of a stream already ordered by `prefix`, sorting only within runs of equal
/// prefix values.
#[derive(Debug)]
pub struct FinishSortingTransform {
    header: SchemaRef,
    prefix: SortDescription,
    description: SortDescription,
    max_block_size: usize,
    limit: usize,
}

impl FinishSortingTransform {
    pub fn new(
        header: SchemaRef,
        prefix: SortDescription,
        description: SortDescription,
        max_block_size: usize,
        limit: usize,
    ) -> Self {
        Self {
            header,
            prefix,
            description,
            max_block_size,
            limit,
        }
    }

    pub fn prefix(&self) -> &SortDescription {
        &self.prefix
    }

    pub fn description(&self) -> &SortDescription {
        &self.description
    }
}

impl Processor for FinishSortingTransform {
    fn name(&self) -> &'static str {
        "FinishSortingTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!(
            "FinishSortingTransform: By = {}, Prefix = {}",
            self.description, self.prefix
        )];
        res.push(format!("Max block size = {}", self.max_block_size));
        if self.limit > 0 {
            res.push(format!("Limit = {}", self.limit));
        }
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
