mod commands;
mod handlers;
pub mod shell;

pub use commands::{Cli, Commands, GlobalArgs};
pub use handlers::{
    handle_delete, handle_edit, handle_list, handle_new, handle_serve, handle_shell, handle_show,
    handle_status, open_state, resolve_config,
};
