use std::io::{self, Read};
use std::net::SocketAddr;

use serde::Serialize;

use super::commands::GlobalArgs;
use crate::config::{BackendConfig, NotesConfig};
use crate::entity::{Note, NoteDraft, NotePatch};
use crate::error::{NotesError, Result};
use crate::markdown;
use crate::state::NotesState;
use crate::storage::{BackendKind, BackendSelector};
use crate::ui::banner::{format_banner, BannerKind, ErrorBanner};
use crate::ui::header::{badge_description, render_header};
use crate::ui::list::{empty_text, render_list, short_id};
use crate::ui::sidebar::filter_notes;

/// Resolve configuration from the environment plus CLI overrides.
pub fn resolve_config(global: &GlobalArgs) -> NotesConfig {
    let mut config = NotesConfig::load();

    if let Some(ref dir) = global.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ref url) = global.remote_url {
        config.backend.remote_url = Some(url.clone());
    }
    if let Some(ref key) = global.remote_key {
        config.backend.remote_key = Some(key.clone());
    }
    if global.local {
        config.backend = BackendConfig::local_only();
    }

    config
}

/// Build and load the state store.
///
/// A remote fallback is reported on stderr and the command continues on
/// local storage; a failure to load at all aborts the command.
pub async fn open_state(global: &GlobalArgs) -> Result<NotesState> {
    let config = resolve_config(global);
    let state = NotesState::new(BackendSelector::new(config.backend, config.data_dir));
    state.initialize().await;

    match state.error().await {
        Some(banner) if banner.kind == BannerKind::RemoteFallback => {
            eprintln!("{}", format_banner(&banner));
            Ok(state)
        }
        Some(banner) => Err(NotesError::Reported(format_banner(&banner))),
        None => Ok(state),
    }
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn reported(state: &NotesState) -> NotesError {
    let banner = state
        .error()
        .await
        .unwrap_or_else(|| ErrorBanner::storage("operation did not complete"));
    NotesError::Reported(format_banner(&banner))
}

pub async fn handle_list(global: &GlobalArgs, query: Option<String>, json: bool) -> Result<()> {
    let state = open_state(global).await?;
    let snapshot = state.snapshot().await;
    let notes: Vec<Note> = filter_notes(&snapshot.notes, query.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();

    if json {
        return print_json(&notes);
    }

    println!("{}", render_header(snapshot.backend));
    print!(
        "{}",
        render_list(&notes, snapshot.selected_id.as_deref(), empty_text(snapshot.loading))
    );
    Ok(())
}

pub async fn handle_new(
    global: &GlobalArgs,
    title: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let content = if stdin { read_stdin()? } else { String::new() };
    let state = open_state(global).await?;

    let note = state
        .create_note_from(NoteDraft::new(title.unwrap_or_default(), content))
        .await?;

    if json {
        print_json(&note)
    } else {
        println!("Created note {} - {}", short_id(&note.id), note.display_title());
        Ok(())
    }
}

pub async fn handle_show(global: &GlobalArgs, id: String, preview: bool, json: bool) -> Result<()> {
    let state = open_state(global).await?;
    let id = state.resolve_id(&id).await?;
    let note = state
        .note(&id)
        .await
        .ok_or_else(|| NotesError::NoteNotFound(id.clone()))?;

    if json {
        return print_json(&note);
    }

    println!("# {}", note.display_title());
    println!("id: {}", note.id);
    println!("updated: {}", note.updated_at.to_rfc3339());
    println!();
    if preview {
        print!("{}", markdown::render(&note.content));
    } else {
        println!("{}", note.content);
    }
    Ok(())
}

pub async fn handle_edit(
    global: &GlobalArgs,
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let content = if stdin { Some(read_stdin()?) } else { content };
    let patch = NotePatch { title, content };
    if patch.is_empty() {
        return Err(NotesError::Config(
            "nothing to update: pass --title, --content or --stdin".to_string(),
        ));
    }

    let state = open_state(global).await?;
    let id = state.resolve_id(&id).await?;
    let Some(note) = state.update_note(&id, patch).await else {
        return Err(reported(&state).await);
    };

    if json {
        print_json(&note)
    } else {
        println!("Updated note {} - {}", short_id(&note.id), note.display_title());
        Ok(())
    }
}

pub async fn handle_delete(global: &GlobalArgs, id: String) -> Result<()> {
    let state = open_state(global).await?;
    let id = state.resolve_id(&id).await?;
    let title = state
        .note(&id)
        .await
        .map(|n| n.display_title().to_string())
        .unwrap_or_default();

    state.delete_note(&id).await?;
    println!("Deleted note {} - {}", short_id(&id), title);
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    backend: BackendKind,
    is_remote: bool,
    notes: usize,
    data_dir: String,
    error: Option<ErrorBanner>,
}

pub async fn handle_status(global: &GlobalArgs, json: bool) -> Result<()> {
    let config = resolve_config(global);
    let state = NotesState::new(BackendSelector::new(
        config.backend.clone(),
        config.data_dir.clone(),
    ));
    state.initialize().await;
    let snapshot = state.snapshot().await;

    let report = StatusReport {
        backend: snapshot.backend,
        is_remote: snapshot.backend == BackendKind::Remote,
        notes: snapshot.notes.len(),
        data_dir: config.data_dir.display().to_string(),
        error: snapshot.error,
    };

    if json {
        return print_json(&report);
    }

    println!("{}", render_header(report.backend));
    println!("{}", badge_description(report.backend));
    println!("Notes: {}", report.notes);
    println!("Data dir: {}", report.data_dir);
    if let Some(ref banner) = report.error {
        println!("{}", format_banner(banner));
    }
    Ok(())
}

pub async fn handle_serve(global: &GlobalArgs, bind: String) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| NotesError::Config(format!("invalid bind address '{}': {}", bind, e)))?;
    let state = open_state(global).await?;
    crate::server::serve(state, addr).await
}

pub async fn handle_shell(global: &GlobalArgs) -> Result<()> {
    let state = open_state(global).await?;
    super::shell::run(state).await
}
