use crate::commands::common::{
    format_note_lines, note_to_list_item, open_session, CliContext, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let session = open_session(context).await?;
    let notes = session.controller().notes();
    session.close().await?;

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if notes.is_empty() {
        println!("No notes yet. Create one with `margin new`.");
    } else {
        for line in format_note_lines(&notes) {
            println!("{line}");
        }
    }

    Ok(())
}
