use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ocean-notes")]
#[command(version, about = "Personal notes with remote or local persistence")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for settings otherwise read from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding the local notes file
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Remote endpoint URL (overrides OCEAN_NOTES_REMOTE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub remote_url: Option<String>,

    /// Remote access key (overrides OCEAN_NOTES_REMOTE_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub remote_key: Option<String>,

    /// Ignore remote settings and use local storage
    #[arg(long, global = true)]
    pub local: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List notes, most recently updated first
    List {
        /// Only show notes whose title or content contains this text
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new note
    New {
        /// Note title (defaults to "Untitled")
        #[arg(long, short = 't')]
        title: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Show {
        /// Note ID or unique prefix
        id: String,

        /// Render content as HTML
        #[arg(long, short = 'p')]
        preview: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a note's title or content
    Edit {
        /// Note ID or unique prefix
        id: String,

        /// New title
        #[arg(long, short = 't')]
        title: Option<String>,

        /// New content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read new content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID or unique prefix
        id: String,
    },

    /// Show which backend is in use and any storage error
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive notes shell
    Shell,

    /// Serve the notes API over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = crate::server::DEFAULT_BIND)]
        bind: String,
    },
}
