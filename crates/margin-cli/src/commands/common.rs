use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use margin_core::cache::NoteCache;
use margin_core::db::{Database, LibSqlCacheSlot, LibSqlNoteStore};
use margin_core::{ClientConfig, Note, Session, SyncController};
use serde::Serialize;

use crate::error::CliError;

pub type CliSession = Session<LibSqlCacheSlot, LibSqlNoteStore>;

/// Paths and settings shared by every command
#[derive(Debug)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub cache_path: PathBuf,
    pub config: ClientConfig,
}

impl CliContext {
    pub fn resolve(
        cli_db_path: Option<PathBuf>,
        cli_cache_path: Option<PathBuf>,
        cli_config_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config_path = match resolve_path(cli_config_path, "MARGIN_CONFIG") {
            Some(path) => path,
            None => default_config_path()?,
        };
        let config = ClientConfig::load(Some(config_path.as_path()))?;

        let db_path = match resolve_path(cli_db_path, "MARGIN_DB_PATH") {
            Some(path) => path,
            None => default_data_path("margin.db")?,
        };
        let cache_path = match resolve_path(cli_cache_path, "MARGIN_CACHE_PATH") {
            Some(path) => path,
            None => default_data_path("cache.db")?,
        };

        Ok(Self {
            db_path,
            cache_path,
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

/// Open the store and cache, start a session and apply the initial snapshot
pub async fn open_session(context: &CliContext) -> Result<CliSession, CliError> {
    let store_db = match context.config.sync_config() {
        Some(sync_config) => Database::open_with_sync(&context.db_path, sync_config).await?,
        None => Database::open(&context.db_path).await?,
    };
    let cache_db = Database::open(&context.cache_path).await?;

    let controller = SyncController::open_with_store(
        NoteCache::new(LibSqlCacheSlot::new(cache_db)),
        LibSqlNoteStore::new(store_db),
        context.config.sync_settings(),
    )
    .await;

    let mut session = Session::start(controller).await;
    session.drain().await;
    Ok(session)
}

pub fn resolve_note<'a>(note_query: &str, notes: &'a [Note]) -> Result<&'a Note, CliError> {
    if let Some(note) = notes.iter().find(|note| note.id.as_str() == note_query) {
        return Ok(note);
    }

    let matching = notes
        .iter()
        .filter(|note| note.id.as_str().starts_with(note_query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query.to_string())),
        [note] => Ok(note),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| note.id.short(13))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let short_id = note.id.short(13);
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.updated_at, now_ms);
            format!("{short_id:<13}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title(),
        body: note.body.clone(),
        created_at: note.created_at,
        updated_at: note.updated_at,
        relative_time: format_relative_time(note.updated_at, now_ms),
    }
}

/// Title collapsed to a single line of at most `max_chars` characters
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let title = note.title();
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Body given on the command line or piped through stdin
pub fn resolve_note_text(text_parts: &[String]) -> Result<Option<String>, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(Some(text));
    }
    read_piped_stdin()
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(CliError::EditorFailed("empty EDITOR command".into()));
    };

    let status = Command::new(program).args(parts).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("margin-note-{}-{now}.md", std::process::id()))
}

/// CLI argument first, then the environment variable
pub fn resolve_path(cli_path: Option<PathBuf>, env_var: &str) -> Option<PathBuf> {
    cli_path.or_else(|| env::var_os(env_var).map(PathBuf::from))
}

fn default_data_path(file_name: &str) -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("margin").join(file_name))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("margin").join("config.json"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}
