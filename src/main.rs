use clap::Parser;

use agilevault::cli::{commands, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::New { path } => commands::new::execute(&cli, path.as_ref()),
        Commands::Info => commands::info::execute(&cli),
        Commands::List { pattern } => commands::list::execute(&cli, pattern.as_deref()),
        Commands::ListFolder { pattern } => commands::list_folder::execute(&cli, pattern),
        Commands::Show { pattern } => commands::show::execute(&cli, pattern, false),
        Commands::ShowJson { pattern } => commands::show::execute(&cli, pattern, true),
        Commands::Add { item_type, title } => commands::add::execute(&cli, item_type, title),
        Commands::AddField { pattern } => commands::add_field::execute(&cli, pattern),
        Commands::Update { pattern } => commands::update::execute(&cli, pattern),
        Commands::Remove { pattern, force } => commands::remove::execute(&cli, pattern, *force),
        Commands::Trash { pattern, force } => commands::trash::execute(&cli, pattern, *force),
        Commands::Restore { pattern } => commands::restore::execute(&cli, pattern),
        Commands::Rename { pattern, new_title } => {
            commands::rename::execute(&cli, pattern, new_title)
        }
        Commands::Copy { pattern, field } => {
            commands::copy::execute(&cli, pattern, field.as_deref())
        }
        Commands::Move {
            item_pattern,
            folder_pattern,
        } => commands::move_cmd::execute(&cli, item_pattern, folder_pattern.as_deref()),
        Commands::Import { path } => commands::import_cmd::execute(&cli, path),
        Commands::Export { pattern, path } => commands::export::execute(&cli, pattern, path),
        Commands::SetPassword => commands::set_password::execute(&cli),
        Commands::SetVault { path } => commands::set_vault::execute(path),
        Commands::GenPassword => commands::gen_password::execute(),
        Commands::Lock => commands::lock::execute(&cli),
        Commands::Agent => commands::agent_cmd::execute(&cli),
    };

    if let Err(e) = result {
        agilevault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
