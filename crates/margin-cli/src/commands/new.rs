use crate::commands::common::{open_session, resolve_note_text, CliContext};
use crate::error::CliError;

pub async fn run_new(text_parts: &[String], context: &CliContext) -> Result<(), CliError> {
    let text = resolve_note_text(text_parts)?;
    let mut session = open_session(context).await?;

    let controller = session.controller_mut();
    let id = controller.create_note().await?;
    if let Some(text) = text {
        controller.update_current_note(&text).await?;
    }

    session.close().await?;
    println!("{id}");
    Ok(())
}
