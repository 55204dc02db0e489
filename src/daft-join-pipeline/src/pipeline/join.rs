use std::sync::Arc;

use common_error::{ensure, DaftResult};
use daft_schema::schema::SchemaRef;

use super::{
    FillingRightJoinSideTransform, MergeJoinTransform, OutputPort, ProcessorRef,
    QueryPipelineBuilder,
};
use crate::{
    join::JoinRef,
    transforms::{FinishCounter, JoiningTransform},
};

fn ensure_has_streams(pipeline: &QueryPipelineBuilder, side: &str) -> DaftResult<()> {
    ensure!(
        pipeline.num_streams() > 0,
        "Cannot join a {side} pipeline without streams"
    );
    Ok(())
}

impl QueryPipelineBuilder {
    /// Joins two pipelines whose streams are sorted on the join keys. Each side is collapsed to a
    /// single stream and both meet in one merging transform, so the result has exactly one
    /// stream. Neither side may carry a totals stream.
    ///
    /// Every processor created is appended to `processors`.
    pub fn join_pipelines_streaming_merge(
        mut left: Self,
        mut right: Self,
        join: JoinRef,
        output_header: SchemaRef,
        max_block_size: usize,
        processors: &mut Vec<ProcessorRef>,
    ) -> DaftResult<Self> {
        ensure_has_streams(&left, "left")?;
        ensure_has_streams(&right, "right")?;
        ensure!(
            !left.has_totals() && !right.has_totals(),
            "Streaming merge join is supported only for pipelines without totals"
        );

        processors.extend(left.resize(1)?);
        processors.extend(right.resize(1)?);

        let left_header = left.header.clone();
        let right_header = right.header.clone();
        let (right_streams, _) = left.absorb(right);

        let transform: ProcessorRef = Arc::new(MergeJoinTransform::new(
            join,
            left_header,
            right_header,
            output_header.clone(),
            max_block_size,
        ));
        let mut inputs = std::mem::take(&mut left.streams);
        inputs.extend(right_streams);
        let id = left.add_node(transform.clone(), inputs);
        left.streams = vec![OutputPort::new(id, 0)];
        left.header = output_header;
        processors.push(transform);
        Ok(left)
    }

    /// Joins `left` against `right` by first materializing `right` into the join's lookup table
    /// and then probing it from every left stream.
    ///
    /// The left side is spread over `max_streams` streams unless `keep_left_order` is set, in
    /// which case its streams are kept as they are and each probe emits rows in the order its
    /// left rows arrived. All probing streams share one [`FinishCounter`]. Left totals are probed
    /// by a separate transform outside that barrier; right totals are dropped.
    ///
    /// Every processor created is appended to `processors`.
    #[allow(clippy::too_many_arguments)]
    pub fn join_pipelines_build_probe(
        mut left: Self,
        mut right: Self,
        join: JoinRef,
        output_header: SchemaRef,
        max_block_size: usize,
        max_streams: usize,
        keep_left_order: bool,
        processors: &mut Vec<ProcessorRef>,
    ) -> DaftResult<Self> {
        ensure_has_streams(&left, "left")?;
        ensure_has_streams(&right, "right")?;

        processors.extend(right.resize(1)?);
        right.drop_totals();
        if !keep_left_order {
            processors.extend(left.resize(max_streams)?);
        }

        let right_header = right.header.clone();
        let (right_streams, _) = left.absorb(right);
        let filling: ProcessorRef = Arc::new(FillingRightJoinSideTransform::new(
            right_header,
            join.clone(),
        ));
        let filling_id = left.add_node(filling.clone(), right_streams);
        let build_done = OutputPort::new(filling_id, 0);
        processors.push(filling);

        let left_header = left.header.clone();
        let finish_counter = Arc::new(FinishCounter::new(left.num_streams()));
        let mut streams = Vec::with_capacity(left.num_streams());
        for port in std::mem::take(&mut left.streams) {
            let probe: ProcessorRef = Arc::new(
                JoiningTransform::new(
                    left_header.clone(),
                    output_header.clone(),
                    join.clone(),
                    max_block_size,
                    false,
                    false,
                    Some(finish_counter.clone()),
                )
                .with_keep_left_order(keep_left_order),
            );
            let id = left.add_node(probe.clone(), vec![port, build_done]);
            streams.push(OutputPort::new(id, 0));
            processors.push(probe);
        }
        left.streams = streams;

        if let Some(port) = left.totals {
            let probe: ProcessorRef = Arc::new(JoiningTransform::new(
                left_header,
                output_header.clone(),
                join,
                max_block_size,
                true,
                false,
                None,
            ));
            let id = left.add_node(probe.clone(), vec![port, build_done]);
            left.totals = Some(OutputPort::new(id, 0));
            processors.push(probe);
        }

        left.header = output_header;
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::{DaftError, DaftResult};
    use daft_schema::{
        dtype::DataType,
        field::Field,
        schema::{Schema, SchemaRef},
    };
    use rstest::rstest;

    use crate::{
        join::{FullSortingMergeJoin, HashJoin, JoinRef, TableJoin},
        pipeline::{
            FillingRightJoinSideTransform, MergeJoinTransform, Processor, QueryPipelineBuilder,
            ResizeProcessor,
        },
        sorting::SortSettings,
        transforms::JoiningTransform,
    };

    fn headers() -> DaftResult<(SchemaRef, SchemaRef, TableJoin)> {
        let left = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ])?);
        let right = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("amount", DataType::Int64),
        ])?);
        let table_join = TableJoin::new(
            vec!["id".to_string()],
            vec!["id".to_string()],
            vec![Field::new("amount", DataType::Int64)],
        )?;
        Ok((left, right, table_join))
    }

    #[test]
    fn streaming_merge_collapses_each_side() -> DaftResult<()> {
        let (left, right, table_join) = headers()?;
        let join: JoinRef = Arc::new(FullSortingMergeJoin::new(
            table_join,
            SortSettings::default(),
        ));
        let output = join.merge_header(&left);
        let left_pipeline = QueryPipelineBuilder::from_sources(left, 3);
        let right_pipeline = QueryPipelineBuilder::from_sources(right, 2);

        let mut processors = vec![];
        let joined = QueryPipelineBuilder::join_pipelines_streaming_merge(
            left_pipeline,
            right_pipeline,
            join,
            output.clone(),
            128,
            &mut processors,
        )?;
        assert_eq!(joined.num_streams(), 1);
        assert!(!joined.has_totals());
        assert_eq!(joined.header(), &output);
        assert_eq!(joined.processors_of::<ResizeProcessor>().len(), 2);
        let merge = joined.processors_of::<MergeJoinTransform>();
        assert_eq!(merge.len(), 1);
        assert_eq!(merge[0].max_block_size(), 128);
        // two resizes plus the merge transform
        assert_eq!(processors.len(), 3);
        Ok(())
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    fn streaming_merge_rejects_totals(
        #[case] left_totals: bool,
        #[case] right_totals: bool,
    ) -> DaftResult<()> {
        let (left, right, table_join) = headers()?;
        let join: JoinRef = Arc::new(FullSortingMergeJoin::new(
            table_join,
            SortSettings::default(),
        ));
        let output = join.merge_header(&left);
        let mut left_pipeline = QueryPipelineBuilder::from_sources(left, 2);
        let mut right_pipeline = QueryPipelineBuilder::from_sources(right, 2);
        if left_totals {
            left_pipeline.add_default_totals()?;
        }
        if right_totals {
            right_pipeline.add_default_totals()?;
        }

        let mut processors = vec![];
        let res = QueryPipelineBuilder::join_pipelines_streaming_merge(
            left_pipeline,
            right_pipeline,
            join,
            output,
            128,
            &mut processors,
        );
        assert!(matches!(res, Err(DaftError::ValueError(msg)) if msg.contains("without totals")));
        assert!(processors.is_empty());
        Ok(())
    }

    #[rstest]
    fn build_probe_spreads_left_unless_order_kept(
        #[values(false, true)] keep_left_order: bool,
    ) -> DaftResult<()> {
        let (left, right, table_join) = headers()?;
        let join: JoinRef = Arc::new(HashJoin::new(table_join));
        let output = join.merge_header(&left);
        let mut left_pipeline = QueryPipelineBuilder::from_sources(left, 2);
        left_pipeline.add_default_totals()?;
        let right_pipeline = QueryPipelineBuilder::from_sources(right, 3);

        let mut processors = vec![];
        let joined = QueryPipelineBuilder::join_pipelines_build_probe(
            left_pipeline,
            right_pipeline,
            join,
            output.clone(),
            128,
            4,
            keep_left_order,
            &mut processors,
        )?;
        let expected_streams = if keep_left_order { 2 } else { 4 };
        assert_eq!(joined.num_streams(), expected_streams);
        assert_eq!(joined.header(), &output);
        assert_eq!(
            joined.processors_of::<FillingRightJoinSideTransform>().len(),
            1
        );

        let probes = joined.processors_of::<JoiningTransform>();
        let (totals, data): (Vec<_>, Vec<_>) = probes.into_iter().partition(|p| p.on_totals());
        assert_eq!(totals.len(), 1);
        assert!(totals[0].finish_counter().is_none());
        assert_eq!(data.len(), expected_streams);
        let counter = data[0].finish_counter().expect("data probes share a counter");
        assert_eq!(counter.remaining(), expected_streams);
        assert!(data.iter().all(|p| {
            p.keep_left_order() == keep_left_order
                && p.finish_counter().is_some_and(|c| Arc::ptr_eq(c, counter))
        }));

        let stream_heads = joined.stream_processors();
        assert!(stream_heads
            .iter()
            .all(|p| p.as_any().is::<JoiningTransform>()));
        Ok(())
    }

    #[test]
    fn empty_pipelines_cannot_be_joined() -> DaftResult<()> {
        let (left, right, table_join) = headers()?;
        let join: JoinRef = Arc::new(HashJoin::new(table_join));
        let output = join.merge_header(&left);
        let res = QueryPipelineBuilder::join_pipelines_build_probe(
            QueryPipelineBuilder::from_sources(left, 0),
            QueryPipelineBuilder::from_sources(right, 1),
            join,
            output,
            128,
            4,
            false,
            &mut vec![],
        );
        assert!(matches!(res, Err(DaftError::ValueError(_))));
        Ok(())
    }
}
