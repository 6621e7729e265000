//! The stage as a pipeline component.
//!
//! [`PipelineComponent`] is the capability set a host composes against:
//! declare the schema, validate, upgrade, prepare a run, process batches and
//! finish the run. [`TalkLookupComponent`] is the talk lookup stage.

use std::future::Future;

use talkmeta_shared::{Result, TalkMetaError};
use tracing::{error, info, instrument};

use crate::binder::bind_columns;
use crate::buffer::{BufferLayout, BufferRow};
use crate::engine::Enricher;
use crate::metadata::StageMetadata;
use crate::provider::CatalogProvider;
use crate::validate::ValidationStatus;

/// Lifecycle operations a host drives, strictly one after another.
pub trait PipelineComponent {
    /// Declare settings, input and outputs on the persisted stage.
    fn define_schema(&self, meta: &mut StageMetadata);

    /// Check the stage before a run. Non-OK outcomes are reported through
    /// the host's error channel and returned.
    fn validate(&self, meta: &StageMetadata) -> ValidationStatus;

    /// Migrate a stage persisted with `persisted_version`.
    fn upgrade(&self, meta: &mut StageMetadata, persisted_version: u32);

    /// Resolve buffer positions and build the per-run lookup state.
    fn pre_execute(
        &mut self,
        meta: &StageMetadata,
        layout: &BufferLayout,
    ) -> impl Future<Output = Result<()>>;

    /// Process one buffer of rows in place. Returns how many rows were
    /// enriched.
    fn process_batch<R: BufferRow>(&self, rows: &mut [R]) -> Result<usize>;

    /// Drop the per-run state.
    fn post_execute(&mut self);
}

/// Enriches rows with the talk of their speaker.
pub struct TalkLookupComponent<P> {
    provider: P,
    run: Option<Enricher>,
}

impl<P: CatalogProvider> TalkLookupComponent<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            run: None,
        }
    }

    /// Whether a run is prepared and batches can be processed.
    pub fn is_prepared(&self) -> bool {
        self.run.is_some()
    }
}

impl<P: CatalogProvider> PipelineComponent for TalkLookupComponent<P> {
    fn define_schema(&self, meta: &mut StageMetadata) {
        crate::schema::define_schema(meta);
    }

    fn validate(&self, meta: &StageMetadata) -> ValidationStatus {
        let status = crate::validate::validate(meta);
        if let Some(message) = status.message() {
            error!(stage = %meta.name, %status, "{message}");
        }
        status
    }

    fn upgrade(&self, meta: &mut StageMetadata, persisted_version: u32) {
        crate::upgrade::upgrade(meta, persisted_version);
    }

    #[instrument(skip_all, fields(stage = %meta.name, address = %meta.config.source_address))]
    async fn pre_execute(&mut self, meta: &StageMetadata, layout: &BufferLayout) -> Result<()> {
        // Positions and catalog from an earlier run are never reused.
        self.run = None;

        let columns = bind_columns(meta, layout)?;
        let catalog = self
            .provider
            .load_catalog(&meta.config.source_address)
            .await?;
        info!(talks = catalog.len(), "catalog loaded");

        self.run = Some(Enricher::new(columns, catalog));
        Ok(())
    }

    fn process_batch<R: BufferRow>(&self, rows: &mut [R]) -> Result<usize> {
        let run = self
            .run
            .as_ref()
            .ok_or_else(|| TalkMetaError::Stage("process_batch called before pre_execute".into()))?;
        Ok(run.process_batch(rows))
    }

    fn post_execute(&mut self) {
        self.run = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use talkmeta_shared::{Catalog, Talk};

    use super::*;
    use crate::buffer::Row;
    use crate::schema::SPEAKER_COLUMN;

    fn catalog() -> Catalog {
        let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        Catalog::new(vec![Talk {
            speaker_names: vec!["Jane Doe".into()],
            title: "Fearless Concurrency".into(),
            description: "Send and Sync".into(),
            begin: at("2024-05-14 09:00"),
            end: at("2024-05-14 09:45"),
        }])
    }

    fn prepared_stage(component: &TalkLookupComponent<Catalog>) -> (StageMetadata, BufferLayout) {
        let mut meta = StageMetadata::new("lookup");
        component.define_schema(&mut meta);
        meta.config.source_address = "https://conf.example.com".into();
        let lineage = meta.map_input_column("Referent", SPEAKER_COLUMN).unwrap();

        let mut layout = BufferLayout::default();
        layout.push(lineage, "Referent");
        for column in &meta.outputs[0].columns {
            layout.push(column.lineage_id, &column.spec.name);
        }
        (meta, layout)
    }

    #[tokio::test]
    async fn runs_through_the_lifecycle() {
        let mut component = TalkLookupComponent::new(catalog());
        let (meta, layout) = prepared_stage(&component);
        assert!(component.validate(&meta).is_valid());

        component.pre_execute(&meta, &layout).await.unwrap();
        assert!(component.is_prepared());

        let mut rows = vec![Row::with_width(5), Row::with_width(5)];
        rows[0].set_string(0, "Jane".into());
        rows[1].set_string(0, "Max".into());
        assert_eq!(component.process_batch(&mut rows).unwrap(), 1);
        assert_eq!(rows[0].get_string(1), Some("Fearless Concurrency"));
        assert_eq!(rows[1].get_string(1), None);

        component.post_execute();
        assert!(!component.is_prepared());
    }

    #[test]
    fn processing_before_pre_execute_fails() {
        let component = TalkLookupComponent::new(catalog());
        let mut rows = vec![Row::with_width(5)];
        let err = component.process_batch(&mut rows).unwrap_err();
        assert!(matches!(err, TalkMetaError::Stage(_)));
    }

    #[tokio::test]
    async fn failed_binding_leaves_no_run_state() {
        let mut component = TalkLookupComponent::new(catalog());
        let (meta, layout) = prepared_stage(&component);
        component.pre_execute(&meta, &layout).await.unwrap();

        let err = component
            .pre_execute(&meta, &BufferLayout::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TalkMetaError::Binding { .. }));
        assert!(!component.is_prepared());
    }
}
