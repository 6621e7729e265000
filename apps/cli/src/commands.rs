//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use talkmeta_core::schema::SPEAKER_COLUMN;
use talkmeta_core::{
    AddressEditor, EditOutcome, PipelineComponent, ProgramCatalogProvider, ProgressReporter,
    RowSet, RunSummary, StageMetadata, TalkLookupComponent, edit_source_address,
    parse_source_address, run_stage,
};
use talkmeta_shared::{
    AppConfig, CURRENT_SCHEMA_VERSION, FetchOptions, TalkMetaError, init_config, load_config,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TalkMeta: enrich speaker rows with talks from a conference program.
#[derive(Parser)]
#[command(
    name = "talkmeta",
    version,
    about = "Create, configure and run a talk lookup pipeline stage.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create a stage file and declare its schema.
    New {
        /// Path of the stage file to create.
        stage: PathBuf,

        /// Conference program address.
        #[arg(short, long)]
        address: Option<String>,

        /// Stage name (defaults to the file stem).
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Upgrade a stage saved by an older release.
    Upgrade {
        /// Stage file.
        stage: PathBuf,
    },

    /// Check whether a stage is ready to run.
    Validate {
        /// Stage file.
        stage: PathBuf,
    },

    /// Map an upstream column onto the Speaker input.
    Map {
        /// Stage file.
        stage: PathBuf,

        /// Upstream column holding speaker names.
        #[arg(short, long, required_unless_present = "unmap", conflicts_with = "unmap")]
        column: Option<String>,

        /// Remove the current mapping instead.
        #[arg(long)]
        unmap: bool,
    },

    /// Set the website address.
    SetAddress {
        /// Stage file.
        stage: PathBuf,

        /// New address.
        address: String,
    },

    /// Edit the website address interactively.
    Edit {
        /// Stage file.
        stage: PathBuf,
    },

    /// Run a tab-separated file through the stage.
    Run {
        /// Stage file.
        stage: PathBuf,

        /// Tab-separated input with a header row.
        #[arg(short, long)]
        input: PathBuf,

        /// Rows per buffer (defaults to the configured batch size).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Program request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "talkmeta=info",
        1 => "talkmeta=debug",
        _ => "talkmeta=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `run` output stays pipeable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::New {
            stage,
            address,
            name,
        } => cmd_new(&stage, address, name),
        Command::Upgrade { stage } => cmd_upgrade(&stage),
        Command::Validate { stage } => cmd_validate(&stage),
        Command::Map {
            stage,
            column,
            unmap,
        } => cmd_map(&stage, column.as_deref(), unmap),
        Command::SetAddress { stage, address } => cmd_set_address(&stage, address),
        Command::Edit { stage } => cmd_edit(&stage),
        Command::Run {
            stage,
            input,
            batch_size,
            timeout,
        } => cmd_run(&stage, &input, batch_size, timeout).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

type Component = TalkLookupComponent<ProgramCatalogProvider>;

fn component(options: FetchOptions) -> Component {
    TalkLookupComponent::new(ProgramCatalogProvider::new(options))
}

/// Load a stage and bring it to the current version in memory, as a host
/// does when it opens a saved pipeline.
fn open_stage(path: &Path, component: &Component) -> Result<StageMetadata> {
    let mut meta = StageMetadata::load(path)?;
    if meta.version != CURRENT_SCHEMA_VERSION {
        let persisted = meta.version;
        component.upgrade(&mut meta, persisted);
        warn!(
            stage = %meta.name,
            persisted,
            "stage is not at the current version; run `talkmeta upgrade` to save the upgrade"
        );
    }
    Ok(meta)
}

// ---------------------------------------------------------------------------
// Stage commands
// ---------------------------------------------------------------------------

fn cmd_new(path: &Path, address: Option<String>, name: Option<String>) -> Result<()> {
    if path.exists() {
        return Err(eyre!("'{}' already exists", path.display()));
    }

    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Talk Lookup".to_string())
    });

    let mut meta = StageMetadata::new(name);
    component(FetchOptions::default()).define_schema(&mut meta);
    if let Some(address) = address {
        meta.config.source_address = address;
    }
    meta.save(path)?;

    info!(stage = %meta.name, id = %meta.id, "stage created");
    println!("Created stage '{}' at {}", meta.name, path.display());
    print_status(&meta);
    Ok(())
}

fn cmd_upgrade(path: &Path) -> Result<()> {
    let mut meta = StageMetadata::load(path)?;
    let persisted = meta.version;
    component(FetchOptions::default()).upgrade(&mut meta, persisted);
    meta.save(path)?;

    println!(
        "Stage '{}' upgraded from version {persisted} to {}",
        meta.name, meta.version
    );
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let component = component(FetchOptions::default());
    let meta = open_stage(path, &component)?;
    let status = component.validate(&meta);

    println!("{status}");
    if status.is_valid() {
        Ok(())
    } else {
        Err(eyre!("stage '{}' is not ready to run", meta.name))
    }
}

fn cmd_map(path: &Path, column: Option<&str>, unmap: bool) -> Result<()> {
    let mut meta = StageMetadata::load(path)?;

    if unmap {
        if meta.unmap_input_column(SPEAKER_COLUMN) {
            println!("Removed the {SPEAKER_COLUMN} mapping");
        } else {
            println!("{SPEAKER_COLUMN} was not mapped");
        }
    } else {
        let column = column.ok_or_else(|| eyre!("--column is required"))?;
        meta.map_input_column(column, SPEAKER_COLUMN)?;
        println!("Mapped upstream column '{column}' to {SPEAKER_COLUMN}");
    }

    meta.save(path)?;
    Ok(())
}

fn cmd_set_address(path: &Path, address: String) -> Result<()> {
    let mut meta = StageMetadata::load(path)?;
    meta.config.source_address = address;
    meta.save(path)?;

    print_status(&meta);
    Ok(())
}

fn cmd_edit(path: &Path) -> Result<()> {
    let mut meta = StageMetadata::load(path)?;

    let stdin = std::io::stdin();
    let mut editor = LinePromptEditor::new(stdin.lock(), std::io::stdout());
    if edit_source_address(&mut meta, &mut editor)? {
        meta.save(path)?;
        println!("Saved.");
        print_status(&meta);
    } else {
        println!("Unchanged.");
    }
    Ok(())
}

/// Print a hint when the address is missing or malformed.
fn print_status(meta: &StageMetadata) {
    let address = &meta.config.source_address;
    if address.is_empty() {
        println!("Website Address is not set yet");
    } else if parse_source_address(address).is_none() {
        println!("Website Address '{address}' is not a valid URI");
    } else {
        println!("Website Address: {address}");
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn cmd_run(
    stage: &Path,
    input: &Path,
    batch_size: Option<usize>,
    timeout: Option<u64>,
) -> Result<()> {
    let config = load_config()?;
    let mut options = FetchOptions::from(&config);
    if let Some(secs) = timeout {
        options.timeout_secs = secs;
    }
    let batch_size = batch_size.unwrap_or(config.run.batch_size);
    if batch_size == 0 {
        return Err(eyre!("--batch-size must be at least 1"));
    }

    let mut component = component(options);
    let meta = open_stage(stage, &component)?;

    let content = std::fs::read_to_string(input)
        .map_err(|e| TalkMetaError::io(input, e))
        .wrap_err("failed to read input")?;
    let (header, records) = parse_tsv(&content)?;
    let mut rowset = RowSet::from_upstream(&meta, &header, records)?;

    info!(
        stage = %meta.name,
        input = %input.display(),
        rows = rowset.len(),
        batch_size,
        "running stage"
    );

    let reporter = CliProgress::new();
    let summary = run_stage(&mut component, &meta, &mut rowset, batch_size, &reporter).await?;

    let mut out = std::io::stdout().lock();
    for record in rowset.records() {
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }

    eprintln!();
    eprintln!("  Rows:    {}", summary.rows);
    eprintln!("  Matched: {}", summary.matched);
    eprintln!("  Buffers: {}", summary.batches);
    eprintln!("  Time:    {:.1}s", summary.elapsed.as_secs_f64());
    eprintln!();

    Ok(())
}

/// Split tab-separated text into a header and records. Empty lines are
/// skipped; a line of tabs or spaces is still a record. A trailing carriage
/// return is dropped.
fn parse_tsv(content: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let header: Vec<String> = lines
        .next()
        .ok_or_else(|| eyre!("input is empty; expected a header row"))?
        .split('\t')
        .map(|s| s.trim().to_string())
        .collect();

    let records = lines
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect();

    Ok((header, records))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn batch_processed(&self, rows_done: usize, rows_total: usize) {
        self.spinner
            .set_message(format!("Enriching rows [{rows_done}/{rows_total}]"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Line prompt editor
// ---------------------------------------------------------------------------

/// Prompts for the website address on a terminal line.
///
/// An empty line or end of input cancels.
struct LinePromptEditor<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePromptEditor<R, W> {
    fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn io_error(e: std::io::Error) -> TalkMetaError {
        TalkMetaError::io("<terminal>", e)
    }
}

impl<R: BufRead, W: Write> AddressEditor for LinePromptEditor<R, W> {
    fn edit_address(&mut self, current: &str) -> talkmeta_shared::Result<EditOutcome> {
        let shown = if current.is_empty() { "<not set>" } else { current };
        writeln!(self.output, "Website Address: {shown}").map_err(Self::io_error)?;
        write!(self.output, "New address (empty to cancel): ").map_err(Self::io_error)?;
        self.output.flush().map_err(Self::io_error)?;

        let mut line = String::new();
        self.input.read_line(&mut line).map_err(Self::io_error)?;
        let value = line.trim();

        if value.is_empty() {
            return Ok(EditOutcome::Cancelled);
        }
        if parse_source_address(value).is_none() {
            writeln!(self.output, "warning: '{value}' is not a valid URI")
                .map_err(Self::io_error)?;
        }
        Ok(EditOutcome::Accepted(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_header_and_records() {
        let (header, records) =
            parse_tsv("Room\tReferent\r\nA1\tJane Doe\r\n\nB2\t\n").unwrap();
        assert_eq!(header, vec!["Room", "Referent"]);
        assert_eq!(
            records,
            vec![
                vec!["A1".to_string(), "Jane Doe".to_string()],
                vec!["B2".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn tab_only_record_is_kept() {
        let (header, records) = parse_tsv("Room\tReferent\nA1\tJane\n\t\nB2\tMax\n").unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], vec![String::new(), String::new()]);

        let (_, records) = parse_tsv("Referent\nJane\n \nMax\n").unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn empty_tsv_is_rejected() {
        assert!(parse_tsv("\n\n").is_err());
    }

    #[test]
    fn prompt_accepts_a_typed_address() {
        let mut out = Vec::new();
        let mut editor = LinePromptEditor::new(&b"https://conf.example.com\n"[..], &mut out);
        let outcome = editor.edit_address("").unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Accepted("https://conf.example.com".into())
        );
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("<not set>"));
    }

    #[test]
    fn prompt_cancels_on_empty_line_or_eof() {
        let mut editor = LinePromptEditor::new(&b"\n"[..], Vec::new());
        assert_eq!(
            editor.edit_address("https://old.example.com").unwrap(),
            EditOutcome::Cancelled
        );

        let mut editor = LinePromptEditor::new(&b""[..], Vec::new());
        assert_eq!(editor.edit_address("").unwrap(), EditOutcome::Cancelled);
    }

    #[test]
    fn prompt_warns_about_malformed_addresses() {
        let mut out = Vec::new();
        let mut editor = LinePromptEditor::new(&b"not a uri\n"[..], &mut out);
        let outcome = editor.edit_address("").unwrap();

        assert_eq!(outcome, EditOutcome::Accepted("not a uri".into()));
        assert!(String::from_utf8(out).unwrap().contains("not a valid URI"));
    }
}
