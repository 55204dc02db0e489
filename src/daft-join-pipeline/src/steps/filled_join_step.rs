use std::sync::Arc;

use daft_schema::schema::SchemaRef;
use snafu::{ensure, ResultExt};
use tracing::info_span;

use crate::{
    diagnostics::PlanEvent,
    join::JoinRef,
    pipeline::{ProcessorRef, QueryPipelineBuilder, StreamType},
    plan_step::{single_pipeline, BuildPipelineSettings, PlanStep, StepTraits, TransformingStep},
    transforms::{FinishCounter, JoiningTransform},
    JoinNotFilledSnafu, PipelineCreationSnafu, Result,
};

const STEP_NAME: &str = "FilledJoinStep";

/// Probes every stream of one pipeline against a join whose table is already built, such as a
/// dictionary or a pre-populated storage join.
#[derive(Debug)]
pub struct FilledJoinStep {
    input_headers: [SchemaRef; 1],
    output_header: SchemaRef,
    join: JoinRef,
    max_block_size: usize,
    processors: Vec<ProcessorRef>,
}

impl FilledJoinStep {
    pub fn new(input_header: SchemaRef, join: JoinRef, max_block_size: usize) -> Result<Self> {
        ensure!(
            join.is_filled(),
            JoinNotFilledSnafu {
                step: STEP_NAME,
                join: join.name(),
            }
        );
        let output_header = join.merge_header(&input_header);
        Ok(Self {
            input_headers: [input_header],
            output_header,
            join,
            max_block_size,
            processors: vec![],
        })
    }

    pub fn join(&self) -> &JoinRef {
        &self.join
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

impl PlanStep for FilledJoinStep {
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
        &self.processors
    }
}

impl TransformingStep for FilledJoinStep {
    fn traits(&self) -> StepTraits {
        StepTraits {
            preserves_distinct_columns: false,
            returns_single_stream: false,
            preserves_number_of_streams: true,
            preserves_sorting: false,
            preserves_number_of_rows: false,
        }
    }

    fn transform_pipeline(
        &mut self,
        pipeline: &mut QueryPipelineBuilder,
        settings: &BuildPipelineSettings,
    ) -> Result<()> {
        let _span = info_span!("FilledJoinStep::transform_pipeline").entered();
        self.processors.clear();

        let has_totals_row = self.join.totals_row().is_some();
        let mut default_totals = false;
        if !pipeline.has_totals() && has_totals_row {
            pipeline
                .add_default_totals()
                .context(PipelineCreationSnafu { step: STEP_NAME })?;
            default_totals = true;
            self.processors.extend(pipeline.totals_processor().cloned());
        }

        let data_streams = pipeline.num_streams();
        let finish_counter = Arc::new(FinishCounter::new(data_streams));
        let output_header = &self.output_header;
        let join = &self.join;
        let max_block_size = self.max_block_size;
        let mut created = Vec::with_capacity(data_streams + 1);
        pipeline
            .add_simple_transform(|header, stream_type| {
                let on_totals = stream_type == StreamType::Totals;
                let counter = if on_totals {
                    None
                } else {
                    Some(finish_counter.clone())
                };
                let transform: ProcessorRef = Arc::new(JoiningTransform::new(
                    header.clone(),
                    output_header.clone(),
                    join.clone(),
                    max_block_size,
                    on_totals,
                    default_totals,
                    counter,
                ));
                created.push(transform.clone());
                Ok(Some(transform))
            })
            .context(PipelineCreationSnafu { step: STEP_NAME })?;
        self.processors.extend(created);

        settings.record(PlanEvent::FilledJoinAttached {
            data_streams,
            default_totals,
            has_totals_row,
        });
        Ok(())
    }

    fn update_input_stream(&mut self, header: SchemaRef) {
        self.input_headers = [header];
        self.update_output_stream();
    }

    fn update_output_stream(&mut self) {
        let [input_header] = &self.input_headers;
        self.output_header = self.join.merge_header(input_header);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::DaftResult;
    use daft_schema::{
        dtype::DataType,
        field::Field,
        schema::{Schema, SchemaRef},
    };
    use rstest::rstest;

    use super::FilledJoinStep;
    use crate::{
        diagnostics::{CollectingEventSink, PlanEvent},
        join::{HashJoin, JoinCapability, JoinRef, LiteralValue, TableJoin, TotalsRow},
        pipeline::{DefaultTotalsSource, QueryPipelineBuilder, SourceProcessor},
        plan_step::{BuildPipelineSettings, PlanStep, TransformingStep},
        transforms::JoiningTransform,
        Error, ErrorKind,
    };

    fn header(fields: &[(&str, DataType)]) -> SchemaRef {
        Arc::new(
            Schema::new(
                fields
                    .iter()
                    .map(|(name, dtype)| Field::new(*name, dtype.clone()))
                    .collect(),
            )
            .expect("valid schema"),
        )
    }

    fn input() -> SchemaRef {
        header(&[("id", DataType::Int64), ("name", DataType::Utf8)])
    }

    fn table_join() -> TableJoin {
        TableJoin::new(
            vec!["id".to_string()],
            vec!["id".to_string()],
            vec![Field::new("amount", DataType::Int64)],
        )
        .expect("valid join clause")
    }

    fn totals() -> TotalsRow {
        TotalsRow::new([("amount", LiteralValue::Int64(100))])
    }

    #[test]
    fn unfilled_join_rejected() {
        let join = Arc::new(HashJoin::new(table_join()));
        let err = FilledJoinStep::new(input(), join.clone(), 1024).expect_err("not filled");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, Error::JoinNotFilled { join: ref name, .. } if name == "HashJoin"));
        // Rejecting the step leaves the join untouched.
        assert!(!join.is_filled());

        join.mark_filled();
        assert!(FilledJoinStep::new(input(), join, 1024).is_ok());
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    fn probes_every_stream_with_shared_counter(#[case] num_streams: usize) -> DaftResult<()> {
        let join: JoinRef = Arc::new(HashJoin::new_filled(table_join()));
        let sink = Arc::new(CollectingEventSink::new());
        let settings = BuildPipelineSettings::default().with_event_sink(sink.clone());
        let mut step = FilledJoinStep::new(input(), join.clone(), 1024)?;
        assert_eq!(step.output_header(), &join.merge_header(&input()));

        let pipeline = step.update_pipeline(
            vec![QueryPipelineBuilder::from_sources(input(), num_streams)],
            &settings,
        )?;
        assert_eq!(pipeline.num_streams(), num_streams);
        assert!(!pipeline.has_totals());
        assert_eq!(pipeline.header(), step.output_header());

        let probes = pipeline.processors_of::<JoiningTransform>();
        assert_eq!(probes.len(), num_streams);
        let counter = probes[0].finish_counter().expect("data streams are counted");
        assert_eq!(counter.remaining(), num_streams);
        assert!(probes.iter().all(|p| {
            !p.on_totals()
                && !p.default_totals()
                && p.finish_counter().is_some_and(|c| Arc::ptr_eq(c, counter))
        }));
        assert_eq!(step.processors().len(), num_streams);
        assert_eq!(
            sink.events(),
            vec![PlanEvent::FilledJoinAttached {
                data_streams: num_streams,
                default_totals: false,
                has_totals_row: false,
            }]
        );
        Ok(())
    }

    #[test]
    fn synthesizes_default_totals_for_join_totals() -> DaftResult<()> {
        let join: JoinRef = Arc::new(HashJoin::new_filled(table_join()).with_totals(totals()));
        let mut step = FilledJoinStep::new(input(), join, 1024)?;
        let mut pipeline = QueryPipelineBuilder::from_sources(input(), 2);
        step.transform_pipeline(&mut pipeline, &BuildPipelineSettings::default())?;

        assert!(pipeline.has_totals());
        assert!(pipeline
            .processors()
            .any(|p| p.as_any().is::<DefaultTotalsSource>()));
        let totals = pipeline.totals_processor().expect("totals stream");
        let totals = totals
            .as_any()
            .downcast_ref::<JoiningTransform>()
            .expect("totals probe");
        assert!(totals.on_totals());
        assert!(totals.default_totals());
        assert!(totals.finish_counter().is_none());

        let data = pipeline.processors_of::<JoiningTransform>();
        let counted = data.iter().filter(|p| p.finish_counter().is_some()).count();
        assert_eq!(counted, 2);
        assert_eq!(
            data.iter()
                .find_map(|p| p.finish_counter())
                .map(|c| c.remaining()),
            Some(2)
        );
        // default totals source, two data probes and the totals probe
        assert_eq!(step.processors().len(), 4);
        Ok(())
    }

    #[test]
    fn existing_totals_are_probed_not_replaced() -> DaftResult<()> {
        let join: JoinRef = Arc::new(HashJoin::new_filled(table_join()).with_totals(totals()));
        let mut step = FilledJoinStep::new(input(), join, 1024)?;
        let mut pipeline = QueryPipelineBuilder::from_sources(input(), 1);
        pipeline.add_totals_source(Arc::new(SourceProcessor::new(input())))?;
        step.transform_pipeline(&mut pipeline, &BuildPipelineSettings::default())?;

        let totals = pipeline.totals_processor().expect("totals stream");
        let totals = totals
            .as_any()
            .downcast_ref::<JoiningTransform>()
            .expect("totals probe");
        assert!(totals.on_totals());
        assert!(!totals.default_totals());
        assert!(pipeline.processors_of::<DefaultTotalsSource>().is_empty());
        Ok(())
    }

    #[test]
    fn output_follows_input_updates() -> DaftResult<()> {
        let join: JoinRef = Arc::new(HashJoin::new_filled(table_join()));
        let mut step = FilledJoinStep::new(input(), join.clone(), 1024)?;
        let new_input = header(&[("id", DataType::Int64), ("amount", DataType::Int64)]);
        step.update_input_stream(new_input.clone());
        assert_eq!(step.input_headers(), &[new_input.clone()]);
        assert_eq!(step.output_header(), &join.merge_header(&new_input));
        assert_eq!(step.output_header().len(), 2);

        let traits = step.traits();
        assert!(traits.preserves_number_of_streams);
        assert!(!traits.returns_single_stream);
        assert!(!traits.preserves_number_of_rows);
        Ok(())
    }

    #[test]
    fn rejects_more_than_one_pipeline() -> DaftResult<()> {
        let join: JoinRef = Arc::new(HashJoin::new_filled(table_join()));
        let mut step = FilledJoinStep::new(input(), join, 1024)?;
        let err = step
            .update_pipeline(
                vec![
                    QueryPipelineBuilder::from_sources(input(), 1),
                    QueryPipelineBuilder::from_sources(input(), 1),
                ],
                &BuildPipelineSettings::default(),
            )
            .expect_err("unary step");
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        Ok(())
    }
}
