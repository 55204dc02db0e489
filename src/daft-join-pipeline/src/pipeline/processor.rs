use std::{any::Any, fmt, sync::Arc};

use common_display::{tree::TreeDisplay, DisplayLevel};
use daft_schema::schema::SchemaRef;

use crate::join::{JoinRef, TotalsRow};

/// One execution node of a compiled pipeline.
pub trait Processor: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn output_header(&self) -> &SchemaRef;

    /// Number of output ports this processor exposes to downstream processors.
    fn num_outputs(&self) -> usize {
        1
    }

    fn multiline_display(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    fn as_any(&self) -> &dyn Any;
}

pub type ProcessorRef = Arc<dyn Processor>;

/// Adapter that lets processors take part in tree rendering.
pub(crate) struct ProcessorDisplay<'a>(pub &'a dyn Processor);

impl TreeDisplay for ProcessorDisplay<'_> {
    fn display_as(&self, level: DisplayLevel) -> String {
        match level {
            DisplayLevel::Compact => self.0.name().to_string(),
            DisplayLevel::Default => self.0.multiline_display().join("\n"),
            DisplayLevel::Verbose => {
                let mut lines = self.0.multiline_display();
                lines.push(format!("Output = {}", self.0.output_header()));
                lines.join("\n")
            }
        }
    }

    fn get_children(&self) -> Vec<&dyn TreeDisplay> {
        vec![]
    }
}

/// Placeholder for whatever produces the rows of a stream upstream of the steps in this crate.
#[derive(Debug)]
pub struct SourceProcessor {
    header: SchemaRef,
}

impl SourceProcessor {
    pub fn new(header: SchemaRef) -> Self {
        Self { header }
    }
}

impl Processor for SourceProcessor {
    fn name(&self) -> &'static str {
        "Source"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Emits one totals row made of default values, for pipelines that had no totals of their own.
#[derive(Debug)]
pub struct DefaultTotalsSource {
    header: SchemaRef,
    row: TotalsRow,
}

impl DefaultTotalsSource {
    pub fn new(header: SchemaRef) -> Self {
        let row = TotalsRow::default_for(&header);
        Self { header, row }
    }

    pub fn row(&self) -> &TotalsRow {
        &self.row
    }
}

impl Processor for DefaultTotalsSource {
    fn name(&self) -> &'static str {
        "DefaultTotalsSource"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Redistributes `num_inputs` streams over `num_outputs` streams.
#[derive(Debug)]
pub struct ResizeProcessor {
    header: SchemaRef,
    num_inputs: usize,
    num_outputs: usize,
}

impl ResizeProcessor {
    pub fn new(header: SchemaRef, num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            header,
            num_inputs,
            num_outputs,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}

impl Processor for ResizeProcessor {
    fn name(&self) -> &'static str {
        "Resize"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.header
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn multiline_display(&self) -> Vec<String> {
        vec![format!("Resize {} -> {}", self.num_inputs, self.num_outputs)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Joins one sorted left stream with one sorted right stream.
#[derive(Debug)]
pub struct MergeJoinTransform {
    join: JoinRef,
    left_header: SchemaRef,
    right_header: SchemaRef,
    output_header: SchemaRef,
    max_block_size: usize,
}

impl MergeJoinTransform {
    pub fn new(
        join: JoinRef,
        left_header: SchemaRef,
        right_header: SchemaRef,
        output_header: SchemaRef,
        max_block_size: usize,
    ) -> Self {
        Self {
            join,
            left_header,
            right_header,
            output_header,
            max_block_size,
        }
    }

    pub fn join(&self) -> &JoinRef {
        &self.join
    }

    pub fn input_headers(&self) -> [&SchemaRef; 2] {
        [&self.left_header, &self.right_header]
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

impl Processor for MergeJoinTransform {
    fn name(&self) -> &'static str {
        "MergeJoinTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.output_header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![self.name().to_string()];
        res.extend(self.join.multiline_display());
        res.push(format!("Max block size = {}", self.max_block_size));
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Consumes the right side of a build-then-probe join into the join's lookup table. Its single
/// output signals that the table is complete.
#[derive(Debug)]
pub struct FillingRightJoinSideTransform {
    join: JoinRef,
    input_header: SchemaRef,
}

impl FillingRightJoinSideTransform {
    pub fn new(input_header: SchemaRef, join: JoinRef) -> Self {
        Self { join, input_header }
    }

    pub fn join(&self) -> &JoinRef {
        &self.join
    }
}

impl Processor for FillingRightJoinSideTransform {
    fn name(&self) -> &'static str {
        "FillingRightJoinSide"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.input_header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![self.name().to_string()];
        res.extend(self.join.multiline_display());
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
