use clap::Parser;
use mfavault::cli::{build_config, commands, Cli, Commands};
use mfavault::errors::Result;

fn main() {
    let cli = Cli::parse();

    // The agent sets up its own logging once it knows where to write.
    if !matches!(cli.command, Commands::RunServer) {
        mfavault::logging::init_cli();
    }

    if let Err(e) = run(&cli) {
        mfavault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        return commands::completions::execute(shell);
    }

    // The agent takes its key from stdin before it loads any configuration.
    if let Commands::RunServer = cli.command {
        let key = commands::server::read_key()?;
        let config = build_config(cli)?;
        return commands::server::run(&config, key);
    }

    let config = build_config(cli)?;

    match cli.command {
        Commands::Add {
            ref client_id,
            ref secret,
            overwrite,
        } => commands::add::execute(&config, client_id, secret.as_deref(), overwrite),
        Commands::List => commands::list::execute(&config),
        Commands::Remove { ref client_id } => commands::remove::execute(&config, client_id),
        Commands::Rename {
            ref old_id,
            ref new_id,
        } => commands::rename::execute(&config, old_id, new_id),
        Commands::DumpSecretsUnencrypted => commands::dump::execute(&config),
        Commands::Print {
            ref client_id,
            newline,
        } => commands::generate::print(&config, client_id, newline),
        Commands::Clipboard {
            ref client_id,
            newline,
        } => commands::generate::clipboard(&config, client_id, newline),
        Commands::StartServer => commands::server::start(&config),
        Commands::StopServer => commands::server::stop(&config),
        Commands::RunServer | Commands::Completions { .. } => Ok(()),
    }
}
