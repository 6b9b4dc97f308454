use std::future::Future;

use anyhow::Result;

/// Runs `future` to completion on a current-thread runtime, the single dispatch thread the tracker
/// is driven from.
///
/// The runtime is shut down in the background afterwards: a pending read on stdin would otherwise
/// keep it from dropping after Ctrl-C.
pub fn block_on_dispatch_thread<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(future);
    runtime.shutdown_background();
    result
}
