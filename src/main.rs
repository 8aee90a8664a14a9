use clap::Parser;
use compvault::cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status => compvault::cli::commands::status::execute(&cli),
        Commands::Setup { force } => compvault::cli::commands::setup::execute(&cli, force),
        Commands::Recover => compvault::cli::commands::recover::execute(&cli),
        Commands::Unlock => compvault::cli::commands::unlock::execute(&cli),
        Commands::Protect { ref value, kind } => {
            compvault::cli::commands::protect::execute(&cli, value, kind)
        }
        Commands::Reveal { ref ciphertext } => {
            compvault::cli::commands::reveal::execute(&cli, ciphertext)
        }
        Commands::Audit { last } => compvault::cli::commands::audit_cmd::execute(&cli, last),
    };

    if let Err(e) = result {
        compvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
