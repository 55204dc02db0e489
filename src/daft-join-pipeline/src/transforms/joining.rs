use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use daft_schema::schema::SchemaRef;

use crate::{
    join::{JoinRef, TotalsRow},
    pipeline::Processor,
};

/// Completion barrier shared by the probing streams of one join.
///
/// Each stream reports completion once through [`FinishCounter::is_last`]; the report that takes
/// the count to zero is the only one that observes `true`.
#[derive(Debug)]
pub struct FinishCounter {
    remaining: AtomicUsize,
}

impl FinishCounter {
    pub fn new(total: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(total),
        }
    }

    /// Records one finished stream. Returns true for exactly one caller: the one that finished
    /// last. Reports past zero return false.
    pub fn is_last(&self) -> bool {
        matches!(
            self.remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)),
            Ok(1)
        )
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

/// Probes one stream of left rows against a join.
///
/// Data-stream transforms share a [`FinishCounter`] with their sibling streams; the one that
/// finishes last releases the join's totals row. The transform on the totals stream never holds
/// a counter.
#[derive(Debug)]
pub struct JoiningTransform {
    input_header: SchemaRef,
    output_header: SchemaRef,
    join: JoinRef,
    max_block_size: usize,
    on_totals: bool,
    default_totals: bool,
    keep_left_order: bool,
    finish_counter: Option<Arc<FinishCounter>>,
    input_finished: AtomicBool,
}

impl JoiningTransform {
    pub fn new(
        input_header: SchemaRef,
        output_header: SchemaRef,
        join: JoinRef,
        max_block_size: usize,
        on_totals: bool,
        default_totals: bool,
        finish_counter: Option<Arc<FinishCounter>>,
    ) -> Self {
        Self {
            input_header,
            output_header,
            join,
            max_block_size,
            on_totals,
            default_totals,
            keep_left_order: false,
            finish_counter,
            input_finished: AtomicBool::new(false),
        }
    }

    /// Emit joined rows in the order their left rows arrived on this stream.
    #[must_use]
    pub fn with_keep_left_order(mut self, keep_left_order: bool) -> Self {
        self.keep_left_order = keep_left_order;
        self
    }

    pub fn input_header(&self) -> &SchemaRef {
        &self.input_header
    }

    pub fn join(&self) -> &JoinRef {
        &self.join
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn on_totals(&self) -> bool {
        self.on_totals
    }

    pub fn default_totals(&self) -> bool {
        self.default_totals
    }

    pub fn keep_left_order(&self) -> bool {
        self.keep_left_order
    }

    pub fn finish_counter(&self) -> Option<&Arc<FinishCounter>> {
        self.finish_counter.as_ref()
    }

    /// Marks this stream's input as exhausted.
    ///
    /// Returns the join's totals row if this was the last data stream of its barrier to finish.
    /// Repeated calls on the same transform, and calls on the totals stream, return `None`.
    pub fn finish_input(&self) -> Option<Arc<TotalsRow>> {
        if self.on_totals || self.input_finished.swap(true, Ordering::AcqRel) {
            return None;
        }
        let counter = self.finish_counter.as_ref()?;
        if counter.is_last() {
            self.join.totals_row()
        } else {
            None
        }
    }

    /// Joins the row arriving on the totals stream. A synthesized default row is a placeholder
    /// and gives way to the join's own totals.
    pub fn join_totals(&self, upstream: Arc<TotalsRow>) -> Arc<TotalsRow> {
        if self.default_totals {
            if let Some(totals) = self.join.totals_row() {
                return totals;
            }
        }
        upstream
    }
}

impl Processor for JoiningTransform {
    fn name(&self) -> &'static str {
        "JoiningTransform"
    }

    fn output_header(&self) -> &SchemaRef {
        &self.output_header
    }

    fn multiline_display(&self) -> Vec<String> {
        let mut res = vec![format!(
            "JoiningTransform: Join = {}{}",
            self.join.name(),
            if self.on_totals { " (totals)" } else { "" }
        )];
        res.push(format!("Max block size = {}", self.max_block_size));
        if self.keep_left_order {
            res.push("Keep left order = true".to_string());
        }
        res
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
