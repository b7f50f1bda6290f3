use crate::commands::common::{
    capture_editor_input_with_initial, normalize_note_identifier, open_session, resolve_note,
    resolve_note_text, CliContext,
};
use crate::error::CliError;

pub async fn run_edit(id: &str, text_parts: &[String], context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let mut session = open_session(context).await?;
    let notes = session.controller().notes();
    let note = resolve_note(&normalized_id, &notes)?;

    let edited = match resolve_note_text(text_parts)? {
        Some(text) => text,
        None => capture_editor_input_with_initial(&note.body)?
            .ok_or(CliError::EmptyEditedContent)?,
    };

    if edited != note.body {
        let controller = session.controller_mut();
        controller.select_note(note.id.clone()).await?;
        controller.update_current_note(&edited).await?;
    }

    session.close().await?;
    println!("{}", note.id);
    Ok(())
}
