//! A minimal in-process host: builds the row buffer from upstream records
//! and drives a component through one run.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use talkmeta_shared::{Result, TalkMetaError};
use tracing::{info, instrument};

use crate::buffer::{BufferLayout, FieldValue, Row};
use crate::component::PipelineComponent;
use crate::metadata::StageMetadata;

/// Upstream rows plus the stage's output columns, in one buffer.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    layout: BufferLayout,
    rows: Vec<Row>,
}

impl RowSet {
    /// Build the buffer for `meta` from upstream records.
    ///
    /// Upstream columns selected into the stage's input take the lineage id
    /// of their input column; the others pass through under fresh ids. The
    /// output columns follow the upstream ones and start out null. Empty
    /// upstream values are read as null. Column names must be unique across
    /// upstream and output columns.
    pub fn from_upstream(
        meta: &StageMetadata,
        header: &[String],
        records: Vec<Vec<String>>,
    ) -> Result<Self> {
        let input = meta
            .inputs
            .first()
            .ok_or_else(|| TalkMetaError::Stage("stage has no input".into()))?;

        if let Some(missing) = input
            .input_columns
            .iter()
            .find(|c| !header.iter().any(|name| *name == c.name))
        {
            return Err(TalkMetaError::Stage(format!(
                "upstream has no column '{}'",
                missing.name
            )));
        }

        let outputs = meta
            .outputs
            .first()
            .map(|o| o.columns.as_slice())
            .unwrap_or_default();
        for (i, name) in header.iter().enumerate() {
            if header[..i].contains(name) {
                return Err(TalkMetaError::Stage(format!(
                    "upstream column '{name}' appears more than once"
                )));
            }
            if outputs.iter().any(|c| c.spec.name == *name) {
                return Err(TalkMetaError::Stage(format!(
                    "upstream column '{name}' collides with an output column"
                )));
            }
        }

        let mut layout = BufferLayout::default();
        let pass_through_base = meta.peek_next_id();
        for (i, name) in header.iter().enumerate() {
            let lineage_id = input
                .input_columns
                .iter()
                .find(|c| c.name == *name)
                .map(|c| c.lineage_id)
                .unwrap_or(pass_through_base + i as u32);
            layout.push(lineage_id, name.as_str());
        }
        for column in outputs {
            layout.push(column.lineage_id, column.spec.name.as_str());
        }

        let width = layout.width();
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(n, record)| {
                if record.len() != header.len() {
                    return Err(TalkMetaError::Stage(format!(
                        "record {} has {} fields, expected {}",
                        n + 1,
                        record.len(),
                        header.len()
                    )));
                }
                let mut fields: Vec<FieldValue> = record
                    .into_iter()
                    .map(|value| {
                        if value.is_empty() {
                            FieldValue::Null
                        } else {
                            FieldValue::WStr(value)
                        }
                    })
                    .collect();
                fields.resize(width, FieldValue::Null);
                Ok(Row::new(fields))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { layout, rows })
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name, in buffer order.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.layout
                    .columns()
                    .iter()
                    .zip(row.fields())
                    .map(|(column, field)| {
                        let value = serde_json::to_value(field).unwrap_or(Value::Null);
                        (column.name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Outcome of [`run_stage`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub matched: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each buffer.
    fn batch_processed(&self, rows_done: usize, rows_total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_processed(&self, _rows_done: usize, _rows_total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run `rowset` through `component` in buffers of `batch_size` rows.
///
/// 1. Validate; a non-OK status refuses the run
/// 2. Prepare (bind columns, build catalog)
/// 3. Process every buffer in order
/// 4. Finish, also when preparation failed
#[instrument(skip_all, fields(stage = %meta.name, rows = rowset.len(), batch_size))]
pub async fn run_stage<C: PipelineComponent>(
    component: &mut C,
    meta: &StageMetadata,
    rowset: &mut RowSet,
    batch_size: usize,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    if batch_size == 0 {
        return Err(TalkMetaError::Stage("batch size must be at least 1".into()));
    }
    let start = Instant::now();

    progress.phase("Validating stage");
    let status = component.validate(meta);
    if let Some(message) = status.message() {
        return Err(TalkMetaError::validation(message));
    }

    progress.phase("Loading program");
    if let Err(e) = component.pre_execute(meta, &rowset.layout).await {
        component.post_execute();
        return Err(e);
    }

    progress.phase("Enriching rows");
    let total = rowset.rows.len();
    let mut matched = 0;
    let mut batches = 0;
    let mut done = 0;
    for batch in rowset.rows.chunks_mut(batch_size) {
        match component.process_batch(batch) {
            Ok(n) => matched += n,
            Err(e) => {
                component.post_execute();
                return Err(e);
            }
        }
        batches += 1;
        done += batch.len();
        progress.batch_processed(done, total);
    }
    component.post_execute();

    let summary = RunSummary {
        rows: total,
        matched,
        batches,
        elapsed: start.elapsed(),
    };
    progress.done(&summary);

    info!(
        rows = summary.rows,
        matched = summary.matched,
        batches = summary.batches,
        elapsed_ms = summary.elapsed.as_millis(),
        "run complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use talkmeta_shared::{Catalog, FetchOptions, Talk};

    use super::*;
    use crate::component::TalkLookupComponent;
    use crate::provider::ProgramCatalogProvider;
    use crate::schema::{SPEAKER_COLUMN, define_schema};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/html/{name}")).expect("read fixture")
    }

    fn stage(address: &str) -> StageMetadata {
        let mut meta = StageMetadata::new("lookup");
        define_schema(&mut meta);
        meta.config.source_address = address.into();
        meta.map_input_column("Referent", SPEAKER_COLUMN).unwrap();
        meta
    }

    fn header() -> Vec<String> {
        vec!["Room".into(), "Referent".into()]
    }

    fn records(speakers: &[&str]) -> Vec<Vec<String>> {
        speakers
            .iter()
            .enumerate()
            .map(|(i, s)| vec![format!("R{i}"), s.to_string()])
            .collect()
    }

    fn catalog() -> Catalog {
        let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        Catalog::new(vec![
            Talk {
                speaker_names: vec!["Jane Doe".into()],
                title: "Fearless Concurrency".into(),
                description: "Send and Sync".into(),
                begin: at("2024-05-14 09:00"),
                end: at("2024-05-14 09:45"),
            },
            Talk {
                speaker_names: vec!["Max Mustermann".into()],
                title: "Async Rust".into(),
                description: "Futures".into(),
                begin: at("2024-05-14 10:00"),
                end: at("2024-05-14 10:45"),
            },
        ])
    }

    #[test]
    fn rowset_layout_has_upstream_then_outputs() {
        let meta = stage("https://conf.example.com");
        let rowset = RowSet::from_upstream(&meta, &header(), records(&["Jane"])).unwrap();

        let names: Vec<&str> = rowset
            .layout()
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Room", "Referent", "Title", "Description", "Begin", "End"]
        );

        let referent = meta.inputs[0].mapped_column(SPEAKER_COLUMN).unwrap();
        assert_eq!(
            rowset.layout().find_column_by_lineage_id(referent.lineage_id),
            Some(1)
        );
        assert_eq!(rowset.rows()[0].len(), 6);
    }

    #[test]
    fn rowset_requires_mapped_upstream_column() {
        let meta = stage("https://conf.example.com");
        let header = vec!["Room".to_string(), "Presenter".to_string()];
        let err = RowSet::from_upstream(&meta, &header, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Referent"));
    }

    #[test]
    fn rowset_rejects_upstream_column_named_like_an_output() {
        let meta = stage("https://conf.example.com");
        let header = vec!["Title".to_string(), "Referent".to_string()];
        let err = RowSet::from_upstream(&meta, &header, Vec::new()).unwrap_err();
        assert!(matches!(err, TalkMetaError::Stage(_)));
        assert!(err.to_string().contains("'Title' collides"));
    }

    #[test]
    fn rowset_rejects_duplicate_upstream_columns() {
        let meta = stage("https://conf.example.com");
        let header = vec!["Referent".to_string(), "Referent".to_string()];
        let err = RowSet::from_upstream(&meta, &header, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rowset_rejects_ragged_records() {
        let meta = stage("https://conf.example.com");
        let records = vec![vec!["R1".to_string()]];
        let err = RowSet::from_upstream(&meta, &header(), records).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[tokio::test]
    async fn run_keeps_row_count_and_order() {
        let meta = stage("https://conf.example.com");
        let speakers = ["Max", "", "Jane", "Unknown Person", "Doe"];

        for batch_size in [1, 2, 5, 100] {
            let mut rowset =
                RowSet::from_upstream(&meta, &header(), records(&speakers)).unwrap();
            let mut component = TalkLookupComponent::new(catalog());
            let summary = run_stage(&mut component, &meta, &mut rowset, batch_size, &SilentProgress)
                .await
                .unwrap();

            assert_eq!(summary.rows, 5);
            assert_eq!(summary.matched, 3);
            assert_eq!(summary.batches, 5usize.div_ceil(batch_size));

            let records = rowset.records();
            let rooms: Vec<&str> = records.iter().map(|r| r["Room"].as_str().unwrap()).collect();
            assert_eq!(rooms, vec!["R0", "R1", "R2", "R3", "R4"]);
            assert_eq!(records[0]["Title"], "Async Rust");
            assert_eq!(records[1]["Title"], Value::Null);
            assert_eq!(records[2]["Begin"], "2024-05-14T09:00:00");
            assert_eq!(records[3]["End"], Value::Null);
            assert_eq!(records[4]["Title"], "Fearless Concurrency");
        }
    }

    #[tokio::test]
    async fn invalid_stage_is_refused() {
        let meta = stage("not a uri");
        let mut rowset = RowSet::from_upstream(&meta, &header(), records(&["Jane"])).unwrap();
        let mut component = TalkLookupComponent::new(catalog());

        let err = run_stage(&mut component, &meta, &mut rowset, 10, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, TalkMetaError::Validation { .. }));
        assert!(err.to_string().contains("uri is not in correct format"));
        assert_eq!(rowset.records()[0]["Title"], Value::Null);
    }

    #[tokio::test]
    async fn runs_against_a_served_program() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/program"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(fixture("program-schema-org.html")),
            )
            .mount(&server)
            .await;

        let meta = stage(&format!("{}/program", server.uri()));
        let mut rowset =
            RowSet::from_upstream(&meta, &header(), records(&["Jane Doe", "Max"])).unwrap();
        let mut component =
            TalkLookupComponent::new(ProgramCatalogProvider::new(FetchOptions::default()));

        let summary = run_stage(&mut component, &meta, &mut rowset, 1024, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.matched, 2);

        let records = rowset.records();
        assert_eq!(records[0]["Title"], "Fearless Concurrency in Practice");
        assert_eq!(records[1]["Title"], "Async Rust Without Tears");
        assert_eq!(records[1]["Begin"], "2024-05-14T10:00:00");
    }

    #[tokio::test]
    async fn provider_failure_aborts_the_run() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let meta = stage(&format!("{}/program", server.uri()));
        let mut rowset = RowSet::from_upstream(&meta, &header(), records(&["Jane"])).unwrap();
        let mut component =
            TalkLookupComponent::new(ProgramCatalogProvider::new(FetchOptions::default()));

        let err = run_stage(&mut component, &meta, &mut rowset, 10, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!component.is_prepared());
    }
}
