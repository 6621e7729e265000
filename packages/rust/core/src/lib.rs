//! The talk lookup stage for TalkMeta.
//!
//! This crate holds the stage's contract with its host pipeline: schema
//! negotiation, validation, column binding, row enrichment and version
//! upgrades, plus a small in-process runner that plays the host.

pub mod binder;
pub mod buffer;
pub mod component;
pub mod edit;
pub mod engine;
pub mod metadata;
pub mod provider;
pub mod runner;
pub mod schema;
pub mod upgrade;
pub mod validate;

pub use component::{PipelineComponent, TalkLookupComponent};
pub use edit::{AddressEditor, EditOutcome, edit_source_address};
pub use metadata::StageMetadata;
pub use provider::{CatalogProvider, ProgramCatalogProvider};
pub use runner::{ProgressReporter, RowSet, RunSummary, SilentProgress, run_stage};
pub use validate::{ValidationStatus, parse_source_address};
