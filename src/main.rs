use clap::Parser;
use form_autofill::cli::commands::{cmd_extract, cmd_plan, cmd_run};
use form_autofill::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // CLI > config file > defaults
    let config = load_config(cli.config.as_deref())?.with_cli_overrides(&cli);

    match &cli.command {
        Commands::Run {
            url,
            profile,
            no_wait,
        } => {
            let submitted = cmd_run(&config, url, profile, *no_wait)?;
            if !submitted {
                std::process::exit(1);
            }
        }
        Commands::Plan {
            html,
            profile,
            replay,
        } => {
            let submitted = cmd_plan(&config, html, profile, replay.as_deref())?;
            if !submitted {
                std::process::exit(1);
            }
        }
        Commands::Extract { html, replay } => {
            cmd_extract(&config, html, replay.as_deref())?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the level follows the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
