use tokio::sync::mpsc;
use tracing::debug;

use super::command::TableCommand;
use super::instance::TableInstance;

const LOG_TARGET: &str = "plo_server::table::actor";

/// Drain the table inbox until shutdown. All table state lives on this
/// task; commands, disconnects and timer callbacks cannot interleave.
pub(crate) async fn run(mut table: TableInstance, mut rx: mpsc::Receiver<TableCommand>) {
    while let Some(cmd) = rx.recv().await {
        if !table.dispatch(cmd) {
            break;
        }
    }
    debug!(target: LOG_TARGET, "table actor exited");
}
