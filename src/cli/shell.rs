//! Line-oriented interactive shell over the notes state store.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::entity::NoteDraft;
use crate::error::Result;
use crate::state::NotesState;
use crate::ui::banner::{format_banner, ErrorBanner};
use crate::ui::editor::{EditorMode, EditorSession};
use crate::ui::header::{render_header, SHORTCUT_TIP};
use crate::ui::list::{empty_text, render_list, short_id, LIST_HEADER};
use crate::ui::sidebar::{filter_notes, SearchBox};

const PROMPT: &str = "notes> ";

const HELP: &str = "\
Commands:
  ls                 list notes matching the current search
  /TEXT, search TEXT filter the list (empty clears the filter)
  new [TITLE]        create a note and open it
  open ID            open a note by id or id prefix
  title TEXT         set the open note's title
  write TEXT         append a line to the open note
  clear              empty the open note's content
  show               print the open note
  preview | edit     switch the editor mode
  save               commit pending edits now
  rm [ID]            delete a note (defaults to the open one)
  status             show the backend in use
  dismiss            clear the error banner
  reload             reload notes from storage
  quit | exit        save and leave
";

/// Outcome of one shell command.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    Quit,
}

pub struct Shell {
    state: NotesState,
    editor: EditorSession,
    search: SearchBox,
    shown_error: Option<ErrorBanner>,
}

impl Shell {
    pub fn new(state: NotesState) -> Self {
        Self {
            editor: EditorSession::new(state.clone()),
            search: SearchBox::default(),
            shown_error: None,
            state,
        }
    }

    pub fn editor(&self) -> &EditorSession {
        &self.editor
    }

    pub async fn greeting(&mut self) -> String {
        self.editor.sync().await;
        let mut out = format!(
            "{}\n{}\n\n",
            render_header(self.state.backend_kind().await),
            SHORTCUT_TIP
        );
        out.push_str(&self.list().await);
        out.push_str(&self.banner_change().await);
        out
    }

    /// Run a single command line.
    pub async fn execute(&mut self, line: &str) -> Result<Step> {
        let line = line.trim();
        let (command, arg) = match line.strip_prefix('/') {
            Some(query) => ("search", query.trim()),
            None => line
                .split_once(char::is_whitespace)
                .map(|(c, a)| (c, a.trim()))
                .unwrap_or((line, "")),
        };

        let mut out = match command {
            "" => String::new(),
            "help" | "?" => HELP.to_string(),
            "ls" | "list" => self.list().await,
            "search" => {
                self.search.submit(arg);
                self.list().await
            }
            "new" => {
                self.editor.flush().await;
                let created = self.state.create_note_from(NoteDraft::new(arg, "")).await;
                self.editor.sync().await;
                match created {
                    Ok(note) => format!("Created {} - {}\n", short_id(&note.id), note.display_title()),
                    Err(_) => String::new(),
                }
            }
            "open" => {
                let id = self.state.resolve_id(arg).await?;
                self.state.select_note(Some(&id)).await;
                self.editor.sync().await;
                self.editor.render()
            }
            "title" => self.with_open_note(|editor| editor.set_title(arg)),
            "write" => self.with_open_note(|editor| editor.append_line(arg)),
            "clear" => self.with_open_note(|editor| editor.set_content("")),
            "show" => {
                self.editor.sync().await;
                self.editor.render()
            }
            "preview" => {
                self.editor.set_mode(EditorMode::Preview);
                self.editor.render()
            }
            "edit" => {
                self.editor.set_mode(EditorMode::Edit);
                self.editor.render()
            }
            "save" => match self.editor.flush().await {
                Some(note) => format!("Saved {}\n", short_id(&note.id)),
                None => String::new(),
            },
            "rm" | "delete" => {
                self.editor.flush().await;
                let target = if arg.is_empty() {
                    self.state.selected_id().await
                } else {
                    Some(self.state.resolve_id(arg).await?)
                };
                match target {
                    Some(id) => {
                        let deleted = self.state.delete_note(&id).await;
                        self.editor.sync().await;
                        match deleted {
                            Ok(()) => format!("Deleted {}\n", short_id(&id)),
                            Err(_) => String::new(),
                        }
                    }
                    None => "No note selected.\n".to_string(),
                }
            }
            "status" => {
                let snapshot = self.state.snapshot().await;
                let mut out = format!(
                    "{}\nNotes: {}\n",
                    render_header(snapshot.backend),
                    snapshot.notes.len()
                );
                if let Some(ref banner) = snapshot.error {
                    out.push_str(&format_banner(banner));
                    out.push('\n');
                }
                out
            }
            "dismiss" => {
                self.state.clear_error().await;
                self.shown_error = None;
                String::new()
            }
            "reload" => {
                self.editor.flush().await;
                self.state.initialize().await;
                self.editor.sync().await;
                self.list().await
            }
            "quit" | "exit" => {
                self.finish().await;
                return Ok(Step::Quit);
            }
            other => format!("Unknown command '{}'. Type \"help\" for commands.\n", other),
        };

        out.push_str(&self.banner_change().await);
        Ok(Step::Continue(out))
    }

    /// Commit pending edits and wait for in-flight work.
    pub async fn finish(&mut self) {
        self.editor.flush().await;
        self.editor.settle().await;
    }

    fn with_open_note(&mut self, edit: impl FnOnce(&mut EditorSession)) -> String {
        if self.editor.note_id().is_none() {
            return "No note open. Use \"new\" or \"open ID\" first.\n".to_string();
        }
        edit(&mut self.editor);
        String::new()
    }

    async fn list(&self) -> String {
        let snapshot = self.state.snapshot().await;
        let query = self.search.query();
        let notes: Vec<_> = filter_notes(&snapshot.notes, &query)
            .into_iter()
            .cloned()
            .collect();

        let listing = render_list(
            &notes,
            snapshot.selected_id.as_deref(),
            empty_text(snapshot.loading),
        );
        match query.trim() {
            "" => listing,
            query => listing.replacen(
                LIST_HEADER,
                &format!("{} (matching \"{}\")", LIST_HEADER, query),
                1,
            ),
        }
    }

    /// The error banner, if it changed since it was last printed.
    async fn banner_change(&mut self) -> String {
        let current = self.state.error().await;
        if current == self.shown_error {
            return String::new();
        }
        self.shown_error = current.clone();
        current
            .map(|banner| format!("{}\n", format_banner(&banner)))
            .unwrap_or_default()
    }
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(state: NotesState) -> Result<()> {
    let mut shell = Shell::new(state);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(shell.greeting().await.as_bytes()).await?;

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            shell.finish().await;
            break;
        };

        match shell.execute(&line).await {
            Ok(Step::Continue(out)) => stdout.write_all(out.as_bytes()).await?,
            Ok(Step::Quit) => break,
            Err(e) => stdout.write_all(format!("Error: {}\n", e).as_bytes()).await?,
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
