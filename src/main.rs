use clap::Parser;
use ocean_notes::cli::{
    handle_delete, handle_edit, handle_list, handle_new, handle_serve, handle_shell, handle_show,
    handle_status, Cli, Commands,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::List { query, json } => handle_list(&global, query, json).await,
        Commands::New { title, stdin, json } => handle_new(&global, title, stdin, json).await,
        Commands::Show { id, preview, json } => handle_show(&global, id, preview, json).await,
        Commands::Edit {
            id,
            title,
            content,
            stdin,
            json,
        } => handle_edit(&global, id, title, content, stdin, json).await,
        Commands::Delete { id } => handle_delete(&global, id).await,
        Commands::Status { json } => handle_status(&global, json).await,
        Commands::Shell => handle_shell(&global).await,
        Commands::Serve { bind } => handle_serve(&global, bind).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
