use margin_core::Tick;

use crate::commands::common::{open_session, CliContext};
use crate::error::CliError;

pub async fn run_sync(context: &CliContext) -> Result<(), CliError> {
    if context.config.sync_config().is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let mut session = open_session(context).await?;
    match session.controller().store() {
        Some(store) if store.is_sync_enabled() => store.sync().await?,
        _ => return Err(CliError::SyncNotConfigured),
    }

    let reconciled = session
        .drain()
        .await
        .into_iter()
        .filter(|tick| matches!(tick, Tick::Reconciled { .. }))
        .count();
    let count = session.controller().notes_in_storage_order().len();
    session.close().await?;

    tracing::debug!(snapshots = reconciled, "Applied snapshots after sync");
    println!("Sync completed ({count} notes)");
    Ok(())
}
