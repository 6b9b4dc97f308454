use std::{io, path::Path};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use crate::{
    host::{
        terminal::{TerminalFrontend, TerminalHost},
        Frontend,
    },
    session::{
        storage::{DocumentStorage, DocumentStorageImpl},
        Action, Session,
    },
    tracker::sampler::SamplerConfig,
    utils::{dir::AppDirs, time::project_name},
};

use super::document_storage;

#[derive(Debug, Parser)]
pub struct ActionCommand {
    #[arg(
        long,
        short,
        help = "Project name or path to the project file. The report uses the file name without extension"
    )]
    pub project: String,
}

/// Runs one user facing action against the stored document of a project.
pub async fn process_action_command(
    ActionCommand { project }: ActionCommand,
    action: Action,
    dirs: &AppDirs,
    assume_yes: bool,
) -> Result<()> {
    let storage = document_storage(dirs)?;
    let mut frontend = TerminalFrontend::new(dirs.texts(), io::stdin().lock(), io::stdout().lock())
        .assume_yes(assume_yes);
    run_action(&project_name(Path::new(&project)), action, &storage, &mut frontend).await
}

/// Loads the document, performs the action and saves after a reset. A project that is being
/// tracked is refused, the running tracker would overwrite the change on its next save.
pub async fn run_action(
    project: &str,
    action: Action,
    storage: &DocumentStorageImpl,
    frontend: &mut dyn Frontend,
) -> Result<()> {
    let _claim = storage.claim(project).await?;
    let document = storage.load(project).await?;
    let mut session = Session::new(document, TerminalHost::new(), SamplerConfig::default());

    session.perform(action, frontend, Utc::now())?;

    if action == Action::Reset {
        storage.save(session.document()).await?;
        info!("Saved {project} after reset");
    }
    Ok(())
}
