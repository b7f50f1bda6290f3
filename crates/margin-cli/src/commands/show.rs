use crate::commands::common::{
    normalize_note_identifier, open_session, resolve_note, CliContext,
};
use crate::error::CliError;

pub async fn run_show(id: &str, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let session = open_session(context).await?;
    let notes = session.controller().notes();
    session.close().await?;

    let note = resolve_note(&normalized_id, &notes)?;
    println!("{}", note.body);
    Ok(())
}
