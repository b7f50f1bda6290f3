use crate::commands::common::{
    normalize_note_identifier, open_session, resolve_note, CliContext,
};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let mut session = open_session(context).await?;
    let notes = session.controller().notes();
    let note = resolve_note(&normalized_id, &notes)?;

    session.controller_mut().delete_note(&note.id).await?;
    session.close().await?;
    println!("{}", note.id);
    Ok(())
}
