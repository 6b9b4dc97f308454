use anyhow::Result;
use timeme::{cli::run_cli, utils::runtime::block_on_dispatch_thread};
use tracing::error;

fn main() -> Result<()> {
    block_on_dispatch_thread(run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
