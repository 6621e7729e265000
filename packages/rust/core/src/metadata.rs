//! Persisted stage definition.
//!
//! This is the part of the host's pipeline package that belongs to one stage:
//! its identity, version stamp, the "Website Address" setting, and the
//! declared input/output collections. It is stored as pretty-printed JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use talkmeta_shared::{ColumnSpec, Result, StageId, TalkMetaError};

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// The stage's only configuration option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Address of the conference program website.
    #[serde(rename = "Website Address", default)]
    pub source_address: String,
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A column the stage declares it expects from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalColumn {
    pub id: u32,
    pub spec: ColumnSpec,
}

/// An upstream column selected into the stage's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputColumn {
    /// Buffer identity of the column.
    pub lineage_id: u32,
    /// Name of the column upstream.
    pub name: String,
    /// External column this input column is mapped onto, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_column_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInput {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub external_columns: Vec<ExternalColumn>,
    #[serde(default)]
    pub input_columns: Vec<InputColumn>,
}

impl StageInput {
    pub fn external_column(&self, name: &str) -> Option<&ExternalColumn> {
        self.external_columns.iter().find(|c| c.spec.name == name)
    }

    /// The input column mapped onto the external column called `name`.
    pub fn mapped_column(&self, name: &str) -> Option<&InputColumn> {
        let external = self.external_column(name)?;
        self.input_columns
            .iter()
            .find(|c| c.external_column_id == Some(external.id))
    }
}

/// A column the stage produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    pub lineage_id: u32,
    pub spec: ColumnSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    pub id: u32,
    pub name: String,
    /// Input whose rows this output extends one-to-one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synchronous_input_id: Option<u32>,
    #[serde(default)]
    pub columns: Vec<OutputColumn>,
}

impl StageOutput {
    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.spec.name == name)
    }
}

// ---------------------------------------------------------------------------
// StageMetadata
// ---------------------------------------------------------------------------

/// Everything the host persists about one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetadata {
    pub id: StageId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_info: String,
    /// Schema version the definition was last written with.
    #[serde(default)]
    pub version: u32,
    #[serde(rename = "properties", default)]
    pub config: StageConfig,
    #[serde(default)]
    pub inputs: Vec<StageInput>,
    #[serde(default)]
    pub outputs: Vec<StageOutput>,
    /// Next unallocated input/output/column identifier.
    #[serde(default = "first_id")]
    next_id: u32,
}

fn first_id() -> u32 {
    1
}

impl StageMetadata {
    /// A blank stage with one empty input and one empty output, as the host
    /// creates it before the component declares its schema.
    pub fn new(name: impl Into<String>) -> Self {
        let mut meta = Self {
            id: StageId::new(),
            name: name.into(),
            description: String::new(),
            contact_info: String::new(),
            version: 0,
            config: StageConfig::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            next_id: first_id(),
        };
        meta.add_input("Input");
        meta.add_output("Output");
        meta
    }

    /// Load a stage definition from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TalkMetaError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            TalkMetaError::Stage(format!("failed to read stage {}: {e}", path.display()))
        })
    }

    /// Write the stage definition as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TalkMetaError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| TalkMetaError::Stage(format!("failed to serialize stage: {e}")))?;
        std::fs::write(path, content).map_err(|e| TalkMetaError::io(path, e))?;
        tracing::debug!(path = %path.display(), stage = %self.name, "stage saved");
        Ok(())
    }

    /// Hand out a fresh identifier for an input, output or column.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The identifier [`allocate_id`](Self::allocate_id) would return next.
    /// Every identifier from here on is unused by this stage.
    pub fn peek_next_id(&self) -> u32 {
        self.next_id
    }

    pub fn add_input(&mut self, name: &str) -> u32 {
        let id = self.allocate_id();
        self.inputs.push(StageInput {
            id,
            name: name.to_string(),
            external_columns: Vec::new(),
            input_columns: Vec::new(),
        });
        id
    }

    pub fn add_output(&mut self, name: &str) -> u32 {
        let id = self.allocate_id();
        self.outputs.push(StageOutput {
            id,
            name: name.to_string(),
            synchronous_input_id: None,
            columns: Vec::new(),
        });
        id
    }

    /// Map the upstream column `upstream_name` onto the external column
    /// `external_name` of the first input, replacing any earlier mapping of
    /// that external column. Returns the lineage id of the input column.
    pub fn map_input_column(&mut self, upstream_name: &str, external_name: &str) -> Result<u32> {
        let lineage_id = self.allocate_id();

        let input = self
            .inputs
            .first_mut()
            .ok_or_else(|| TalkMetaError::Stage("stage has no input".into()))?;
        let external_id = input
            .external_column(external_name)
            .map(|c| c.id)
            .ok_or_else(|| {
                TalkMetaError::Stage(format!("input declares no external column '{external_name}'"))
            })?;

        input
            .input_columns
            .retain(|c| c.external_column_id != Some(external_id));
        input.input_columns.push(InputColumn {
            lineage_id,
            name: upstream_name.to_string(),
            external_column_id: Some(external_id),
        });

        tracing::debug!(upstream_name, external_name, lineage_id, "input column mapped");
        Ok(lineage_id)
    }

    /// Remove the mapping of the external column `external_name`.
    /// Returns whether a mapping existed.
    pub fn unmap_input_column(&mut self, external_name: &str) -> bool {
        let Some(input) = self.inputs.first_mut() else {
            return false;
        };
        let Some(external_id) = input.external_column(external_name).map(|c| c.id) else {
            return false;
        };

        let before = input.input_columns.len();
        input
            .input_columns
            .retain(|c| c.external_column_id != Some(external_id));
        before != input.input_columns.len()
    }
}
