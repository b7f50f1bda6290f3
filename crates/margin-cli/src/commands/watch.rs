use std::future::pending;
use std::time::Duration;

use margin_core::Tick;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::commands::common::{format_note_lines, open_session, CliContext, CliSession};
use crate::error::CliError;

pub async fn run_watch(context: &CliContext) -> Result<(), CliError> {
    let mut session = open_session(context).await?;
    print_notes(&session);

    let mut pull = remote_pull_interval(&session, context.config.sync_interval_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Only cancel-safe futures race here; a wake is applied after the race.
    loop {
        let wake = tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            () = next_pull(pull.as_mut()) => {
                if let Some(store) = session.controller().store() {
                    if let Err(error) = store.sync().await {
                        tracing::warn!("Remote pull failed: {}", error);
                    }
                }
                continue;
            }
            wake = session.wait() => wake,
        };

        match session.handle(wake).await? {
            Tick::Reconciled { .. } => print_notes(&session),
            Tick::StreamError(message) => eprintln!("Sync error: {message}"),
            Tick::StreamClosed => {
                eprintln!("Note store closed the update stream");
                break;
            }
            Tick::Idle => {
                (&mut shutdown).await?;
                break;
            }
            Tick::Flushed { .. } | Tick::FlushSkipped => {}
        }
    }

    session.close().await?;
    Ok(())
}

fn print_notes(session: &CliSession) {
    let controller = session.controller();
    let notes = controller.notes();
    println!(
        "-- {} notes ({})",
        notes.len(),
        controller.sync_state().label()
    );
    for line in format_note_lines(&notes) {
        println!("{line}");
    }
}

/// Periodic remote pull for replicas; `None` for a local database
fn remote_pull_interval(session: &CliSession, every_secs: u64) -> Option<Interval> {
    let replica = session
        .controller()
        .store()
        .is_some_and(margin_core::db::LibSqlNoteStore::is_sync_enabled);
    if !replica || every_secs == 0 {
        return None;
    }

    let period = Duration::from_secs(every_secs);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.reset();
    Some(ticker)
}

async fn next_pull(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}
