mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `hook` installs its own subscriber writing beside the store
    if !matches!(cli.command, Commands::Hook) {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .init();
    }

    match cli.command {
        Commands::Hook => commands::hook::run(cli.store),
        Commands::Audit {
            session,
            min_fires,
            threshold,
            json,
        } => commands::audit::run(
            cli.store,
            &commands::audit::AuditArgs {
                scope: session,
                min_fires,
                threshold,
                json,
            },
        ),
        Commands::Sessions { limit, json } => commands::sessions::run(cli.store, limit, json),
        Commands::Tail {
            since_offset,
            resume,
            session,
        } => commands::tail::run(cli.store, since_offset, resume, session.as_deref()),
        Commands::Version => commands::version::run(),
    }
}
