//! surfboard - browse Stremio addons from the terminal
//!
//! # Usage
//!
//! ```bash
//! surfboard addons
//! surfboard search "blade runner" --json
//! surfboard streams movie tt1856101 --quality 1080p --sort seeds
//! ```

use clap::Parser;

use surfboard::cli::{Cli, Command, ExitCode, Output};
use surfboard::commands::{self, Paths};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let paths = Paths::new(cli.config.clone());

    match cli.command {
        Command::Addons(cmd) => commands::addons_cmd(cmd, &paths, &output).await,

        Command::Catalogs(cmd) => commands::catalogs_cmd(cmd, &paths, &output).await,

        Command::Search(cmd) => commands::search_cmd(cmd, &paths, &output).await,

        Command::Meta(cmd) => commands::meta_cmd(cmd, &paths, &output).await,

        Command::Streams(cmd) => commands::streams_cmd(cmd, &paths, &output).await,

        Command::AddonAdd(cmd) => commands::addon_add_cmd(cmd, &paths, &output).await,

        Command::AddonRemove(cmd) => commands::addon_remove_cmd(cmd, &paths, &output).await,

        Command::Settings(cmd) => commands::settings_cmd(cmd, &paths, &output).await,

        Command::ContinueWatching => commands::continue_cmd(&paths, &output).await,

        Command::Favorites => commands::favorites_cmd(&paths, &output).await,

        Command::Favorite(cmd) => commands::favorite_cmd(cmd, &paths, &output).await,
    }
}

/// Logs go to stderr so stdout stays parseable; RUST_LOG overrides the level
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("surfboard=debug")
        } else {
            EnvFilter::new("surfboard=warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
