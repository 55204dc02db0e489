//! Processor-graph model of a compiled pipeline.
//!
//! A [`QueryPipelineBuilder`] tracks the processors created so far, the open output ports of its
//! data streams, an optional totals stream, and the header every open stream carries. Steps extend
//! it; the execution engine (out of scope here) runs the finished graph.

mod join;
mod processor;

use std::sync::Arc;

use common_error::{ensure, DaftError, DaftResult};
use daft_schema::schema::SchemaRef;
pub use processor::{
    DefaultTotalsSource, FillingRightJoinSideTransform, MergeJoinTransform, Processor,
    ProcessorRef, ResizeProcessor, SourceProcessor,
};
pub(crate) use processor::ProcessorDisplay;

pub type ProcessorId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputPort {
    pub processor: ProcessorId,
    pub port: usize,
}

impl OutputPort {
    fn new(processor: ProcessorId, port: usize) -> Self {
        Self { processor, port }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamType {
    Main,
    Totals,
}

#[derive(Debug)]
pub struct PipelineNode {
    pub processor: ProcessorRef,
    pub inputs: Vec<OutputPort>,
}

#[derive(Debug)]
pub struct QueryPipelineBuilder {
    nodes: Vec<PipelineNode>,
    streams: Vec<OutputPort>,
    totals: Option<OutputPort>,
    header: SchemaRef,
}

impl QueryPipelineBuilder {
    /// A pipeline of `num_streams` independent sources producing `header`.
    pub fn from_sources(header: SchemaRef, num_streams: usize) -> Self {
        let mut pipeline = Self {
            nodes: Vec::with_capacity(num_streams),
            streams: Vec::with_capacity(num_streams),
            totals: None,
            header: header.clone(),
        };
        for _ in 0..num_streams {
            let id = pipeline.add_node(Arc::new(SourceProcessor::new(header.clone())), vec![]);
            pipeline.streams.push(OutputPort::new(id, 0));
        }
        pipeline
    }

    pub fn header(&self) -> &SchemaRef {
        &self.header
    }

    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn has_totals(&self) -> bool {
        self.totals.is_some()
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn processors(&self) -> impl Iterator<Item = &ProcessorRef> {
        self.nodes.iter().map(|n| &n.processor)
    }

    /// Every processor in the graph that is a `T`.
    pub fn processors_of<T: Processor + 'static>(&self) -> Vec<&T> {
        self.processors()
            .filter_map(|p| p.as_any().downcast_ref::<T>())
            .collect()
    }

    /// The processors feeding the currently open data streams, in stream order.
    pub fn stream_processors(&self) -> Vec<&ProcessorRef> {
        self.streams
            .iter()
            .map(|port| &self.nodes[port.processor].processor)
            .collect()
    }

    pub fn totals_processor(&self) -> Option<&ProcessorRef> {
        self.totals.map(|port| &self.nodes[port.processor].processor)
    }

    pub fn add_totals_source(&mut self, source: ProcessorRef) -> DaftResult<()> {
        if self.has_totals() {
            return Err(DaftError::ValueError(
                "Pipeline already has a totals stream".to_string(),
            ));
        }
        if source.output_header() != &self.header {
            return Err(DaftError::SchemaMismatch(format!(
                "Totals source header {} does not match pipeline header {}",
                source.output_header(),
                self.header
            )));
        }
        let id = self.add_node(source, vec![]);
        self.totals = Some(OutputPort::new(id, 0));
        Ok(())
    }

    /// Adds a totals stream holding a single row of default values.
    pub fn add_default_totals(&mut self) -> DaftResult<()> {
        self.add_totals_source(Arc::new(DefaultTotalsSource::new(self.header.clone())))
    }

    /// Appends one transform to every open stream, totals included. `make_transform` receives the
    /// current header and the kind of stream; returning `None` leaves that stream untouched.
    ///
    /// All produced transforms must agree on their output header. On error the pipeline is left
    /// as it was.
    pub fn add_simple_transform<F>(&mut self, mut make_transform: F) -> DaftResult<()>
    where
        F: FnMut(&SchemaRef, StreamType) -> DaftResult<Option<ProcessorRef>>,
    {
        let mut new_header: Option<SchemaRef> = None;
        let mut check_header = |processor: &ProcessorRef| -> DaftResult<()> {
            match &new_header {
                Some(header) if header != processor.output_header() => {
                    Err(DaftError::SchemaMismatch(format!(
                        "Transform {} produces header {} but other streams produce {}",
                        processor.name(),
                        processor.output_header(),
                        header
                    )))
                }
                Some(_) => Ok(()),
                None => {
                    new_header = Some(processor.output_header().clone());
                    Ok(())
                }
            }
        };

        let header = self.header.clone();
        let mut staged = Vec::with_capacity(self.streams.len());
        for _ in 0..self.streams.len() {
            let transform = make_transform(&header, StreamType::Main)?;
            if let Some(transform) = &transform {
                check_header(transform)?;
            }
            staged.push(transform);
        }
        let totals_transform = match self.totals {
            Some(_) => make_transform(&header, StreamType::Totals)?,
            None => None,
        };
        if let Some(transform) = &totals_transform {
            check_header(transform)?;
        }

        let old_streams = std::mem::take(&mut self.streams);
        let mut streams = Vec::with_capacity(old_streams.len());
        for (port, transform) in old_streams.into_iter().zip(staged) {
            match transform {
                Some(transform) => {
                    let id = self.add_node(transform, vec![port]);
                    streams.push(OutputPort::new(id, 0));
                }
                None => streams.push(port),
            }
        }
        self.streams = streams;

        if let (Some(port), Some(transform)) = (self.totals, totals_transform) {
            let id = self.add_node(transform, vec![port]);
            self.totals = Some(OutputPort::new(id, 0));
        }

        if let Some(header) = new_header {
            self.header = header;
        }
        Ok(())
    }

    /// Feeds every open data stream into `transform`, whose outputs become the new data streams.
    pub fn add_merging_transform(&mut self, transform: ProcessorRef) -> ProcessorId {
        let inputs = std::mem::take(&mut self.streams);
        self.header = transform.output_header().clone();
        let num_outputs = transform.num_outputs();
        let id = self.add_node(transform, inputs);
        self.streams = (0..num_outputs).map(|port| OutputPort::new(id, port)).collect();
        id
    }

    /// Changes the number of data streams to exactly `num_streams`. Returns the resize processor
    /// if one was needed.
    pub fn resize(&mut self, num_streams: usize) -> DaftResult<Option<ProcessorRef>> {
        ensure!(num_streams > 0, "Cannot resize a pipeline to zero streams");
        ensure!(
            !self.streams.is_empty(),
            "Cannot resize a pipeline without streams"
        );
        if self.streams.len() == num_streams {
            return Ok(None);
        }
        let resize: ProcessorRef = Arc::new(ResizeProcessor::new(
            self.header.clone(),
            self.streams.len(),
            num_streams,
        ));
        self.add_merging_transform(resize.clone());
        Ok(Some(resize))
    }

    /// Drops the totals stream, if any. Its processors stay in the graph.
    pub fn drop_totals(&mut self) {
        self.totals = None;
    }

    fn add_node(&mut self, processor: ProcessorRef, inputs: Vec<OutputPort>) -> ProcessorId {
        let id = self.nodes.len();
        self.nodes.push(PipelineNode { processor, inputs });
        id
    }

    /// Moves every node of `other` into this graph. Returns the open data streams and totals
    /// stream of `other`, rewritten to the new processor ids.
    fn absorb(&mut self, other: Self) -> (Vec<OutputPort>, Option<OutputPort>) {
        let offset = self.nodes.len();
        let shift = |port: OutputPort| OutputPort::new(port.processor + offset, port.port);
        self.nodes
            .extend(other.nodes.into_iter().map(|node| PipelineNode {
                processor: node.processor,
                inputs: node.inputs.into_iter().map(shift).collect(),
            }));
        (
            other.streams.into_iter().map(shift).collect(),
            other.totals.map(shift),
        )
    }
}
