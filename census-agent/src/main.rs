//! ceph-census - command surface for cluster census reports
//!
//! - no command: print the report, no network action
//! - `update-metadata --key=value ...`: merge ownership fields
//! - `clear-metadata`: delete ownership metadata
//! - `publish`: build and PUT the report to the ownership URL
//! - `unpublish --yes-i-am-shy`: DELETE the published report

use census_agent::error::EXIT_USAGE;
use census_agent::{Census, CensusConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ceph-census", version)]
#[command(about = "Anonymized census report for a Ceph cluster", long_about = None)]
struct Cli {
    /// Echo every control-plane call and HTTP request
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $CEPH_CENSUS_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge ownership fields: --name= --organization= --email= --description= --url=
    UpdateMetadata {
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Delete ownership metadata
    ClearMetadata,
    /// Build the report and publish it to the ownership URL
    Publish,
    /// Withdraw the published report
    Unpublish {
        #[arg(long = "yes-i-am-shy")]
        yes_i_am_shy: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "census_agent=debug,ceph_census=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn load_config(cli: &Cli) -> anyhow::Result<CensusConfig> {
    let config = match &cli.config {
        Some(path) => CensusConfig::load_from(path).await?,
        None => CensusConfig::load().await?,
    };
    Ok(config.with_verbose(cli.verbose))
}

async fn run(command: Option<Command>, config: &CensusConfig) -> census_agent::Result<()> {
    let census = Census::new(config)?;

    match command {
        None => {
            let built = census.report().await?;
            println!("{}", built.report.to_json_pretty()?);
        }
        Some(Command::UpdateMetadata { fields }) => {
            census.update_metadata(&fields).await?;
        }
        Some(Command::ClearMetadata) => census.clear_metadata().await?,
        Some(Command::Publish) => census.publish().await?,
        Some(Command::Unpublish { yes_i_am_shy }) => census.unpublish(yes_i_am_shy).await?,
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Using {:?}", config);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
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
    fn test_no_command_prints_report() {
        let cli = Cli::try_parse_from(["ceph-census"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_verbose_first() {
        let cli = Cli::try_parse_from(["ceph-census", "--verbose", "publish"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Command::Publish)));
    }

    #[test]
    fn test_update_metadata_collects_assignments() {
        let cli = Cli::try_parse_from([
            "ceph-census",
            "update-metadata",
            "--name=Storage Lab",
            "--url=http://brag.example.com/",
        ])
        .unwrap();
        match cli.command {
            Some(Command::UpdateMetadata { fields }) => {
                assert_eq!(fields, vec!["--name=Storage Lab", "--url=http://brag.example.com/"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unpublish_confirmation_flag() {
        let cli = Cli::try_parse_from(["ceph-census", "unpublish", "--yes-i-am-shy"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Unpublish { yes_i_am_shy: true })));

        let cli = Cli::try_parse_from(["ceph-census", "unpublish"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Unpublish { yes_i_am_shy: false })));
    }

    #[test]
    fn test_unknown_command_is_usage_error() {
        let err = Cli::try_parse_from(["ceph-census", "brag-louder"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
