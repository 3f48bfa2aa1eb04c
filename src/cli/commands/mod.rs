//! One module per CLI command.

pub mod add;
pub mod add_field;
pub mod agent_cmd;
pub mod copy;
pub mod export;
pub mod gen_password;
pub mod import_cmd;
pub mod info;
pub mod list;
pub mod list_folder;
pub mod lock;
pub mod move_cmd;
pub mod new;
pub mod remove;
pub mod rename;
pub mod restore;
pub mod set_password;
pub mod set_vault;
pub mod show;
pub mod trash;
pub mod update;
