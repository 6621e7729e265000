//! TalkMeta TUI: the "Website Address" dialog of a talk lookup stage.
//!
//! Opens a stage file, lets the user edit the program address and saves it
//! on Enter. Esc leaves the stage untouched.

mod app;
mod widgets;

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::Result;
use talkmeta_core::{StageMetadata, edit_source_address};
use talkmeta_shared::config_dir;

/// Edit the website address of a talk lookup stage.
#[derive(Parser)]
#[command(name = "talkmeta-tui", version, long_about = None)]
struct Args {
    /// Stage file to edit.
    stage: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing();

    let mut meta = StageMetadata::load(&args.stage)?;
    let mut dialog = app::TerminalDialog;
    let changed = edit_source_address(&mut meta, &mut dialog)?;

    if changed {
        meta.save(&args.stage)?;
        println!("Website Address saved: {}", meta.config.source_address);
    } else {
        println!("Website Address unchanged.");
    }
    Ok(())
}

/// Log to `~/.talkmeta/tui.log`; the terminal belongs to the dialog.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let Ok(dir) = config_dir() else { return };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))
    else {
        return;
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("talkmeta=info"));
    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
