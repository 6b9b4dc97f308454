//! Headless host for the tracker. `track` plays the part of the host's event loop, the other
//! commands are the user facing actions run against a stored document.

pub mod actions;
pub mod shutdown;
pub mod track;

use std::path::PathBuf;

use actions::{process_action_command, ActionCommand};
use anyhow::Result;
use clap::{Parser, Subcommand};
use track::{process_track_command, TrackCommand};

use crate::{
    session::{storage::DocumentStorageImpl, Action},
    utils::{
        dir::AppDirs,
        logging::{enable_logging, CLI_PREFIX, TRACK_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "TimeMe", version, long_about = None)]
#[command(about = "Tracks how much time goes into a project", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable trace logging, mirrored to stderr")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Start tracking. Every line on stdin is an event kind, except RENDER_INIT, RENDER_COMPLETE and RENDER_CANCEL (render notifications) and PRINT, COPY and RESET (actions on the live totals, RESET takes the next line as its y/N answer)"
    )]
    Track {
        #[command(flatten)]
        command: TrackCommand,
    },
    #[command(about = "Print the report into the TimeMe text buffer")]
    Print {
        #[command(flatten)]
        command: ActionCommand,
    },
    #[command(about = "Copy the report to the clipboard (stdout)")]
    Copy {
        #[command(flatten)]
        command: ActionCommand,
    },
    #[command(about = "Clear all categories of a project")]
    Reset {
        #[command(flatten)]
        command: ActionCommand,
        #[arg(long, short, help = "Don't ask for confirmation")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dirs = AppDirs::resolve(args.dir)?;

    let prefix = match args.commands {
        Commands::Track { .. } => TRACK_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &dirs.logs(), args.log)?;

    match args.commands {
        Commands::Track { command } => process_track_command(command, &dirs).await,
        Commands::Print { command } => {
            process_action_command(command, Action::Print, &dirs, false).await
        }
        Commands::Copy { command } => {
            process_action_command(command, Action::Copy, &dirs, false).await
        }
        Commands::Reset { command, yes } => {
            process_action_command(command, Action::Reset, &dirs, yes).await
        }
    }
}

fn document_storage(dirs: &AppDirs) -> Result<DocumentStorageImpl> {
    Ok(DocumentStorageImpl::new(dirs.sessions())?)
}
