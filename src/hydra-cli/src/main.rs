mod cli;
mod commands;
mod config;
mod process;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::*;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Decode { input, output } => {
            commands::container::decode(&input, output.as_deref())?;
        }

        Commands::List { input, filter } => {
            commands::container::list(&input, filter.as_deref())?;
        }

        Commands::Export {
            input,
            output,
            filter,
            keep_decoded,
            timeout,
        } => {
            commands::container::export(
                &input,
                output.as_deref(),
                filter.as_deref(),
                keep_decoded,
                timeout,
            )?;
        }

        Commands::Memory { pid, action } => {
            commands::memory::handle(pid, action)?;
        }

        Commands::Configure {
            show,
            export_dir,
            keep_decoded,
            process_name,
            profile,
            enable,
            disable,
        } => {
            let changes = commands::configure::Changes {
                export_dir,
                keep_decoded,
                process_name,
                profile,
                enable,
                disable,
            };
            commands::configure::handle(changes, show)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export() {
        let cli = Cli::parse_from(["hydra", "-v", "export", "zm_tomb.ff", "-o", "out", "--filter", "zm ui"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Export { input, output, filter, keep_decoded, timeout } => {
                assert_eq!(input, std::path::PathBuf::from("zm_tomb.ff"));
                assert_eq!(output, Some(std::path::PathBuf::from("out")));
                assert_eq!(filter.as_deref(), Some("zm ui"));
                assert!(!keep_decoded);
                assert_eq!(timeout, None);
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn test_parse_memory_list() {
        let cli = Cli::parse_from(["hydra", "memory", "--pid", "42", "list"]);
        match cli.command {
            Commands::Memory { pid, action } => {
                assert_eq!(pid, Some(42));
                assert!(matches!(action, MemoryAction::List { filter: None }));
            }
            _ => panic!("expected memory"),
        }
    }
}
