use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use npmeta_utils::time::parse_duration;

fn duration_arg(value: &str) -> Result<Duration, String> {
    match parse_duration(value) {
        Some(duration) if !duration.is_zero() => Ok(duration),
        Some(_) => Err("must be greater than zero".to_string()),
        None => Err(format!("invalid duration `{value}`, expected e.g. `30s` or `2m`")),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    /// Cap each tarball download at this duration (e.g. `30s`)
    #[arg(required = false, long, global = true, value_parser = duration_arg)]
    pub fetch_timeout: Option<Duration>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest package tarballs into the metadata store
    ///
    /// Pass `-` to read whitespace-separated locators from stdin.
    #[command(arg_required_else_help = true)]
    #[clap(name = "ingest", visible_alias = "add")]
    Ingest {
        /// Tarball locators: URLs, file paths, or keys under the tarball directory
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        locators: Vec<String>,
    },

    /// Handle index requests, one JSON body per line
    ///
    /// Each line like {"key": "<locator>"} produces one JSON response line.
    #[clap(name = "index")]
    Index {
        /// Read requests from this file instead of stdin
        #[arg(required = false, short, long, value_hint = ValueHint::FilePath)]
        input: Option<String>,
    },

    /// Print the stored metadata document of a package
    #[command(arg_required_else_help = true)]
    #[clap(name = "show", visible_alias = "info")]
    Show {
        /// Package name
        #[arg(required = true)]
        name: String,
    },

    /// Print the effective configuration to stdout
    Config,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_with_globals() {
        let args = Args::parse_from([
            "npmeta",
            "-vv",
            "ingest",
            "foo/foo-1.0.0.tgz",
            "https://registry.local/bar/-/bar-2.0.0.tgz",
            "-H",
            "X-Mirror: eu-1",
        ]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.header, Some(vec!["X-Mirror: eu-1".to_string()]));
        match args.command {
            Commands::Ingest {
                locators,
            } => assert_eq!(locators.len(), 2),
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_parse_fetch_timeout() {
        let args = Args::parse_from(["npmeta", "--fetch-timeout", "1m30s", "ingest", "k"]);
        assert_eq!(args.fetch_timeout, Some(Duration::from_secs(90)));

        assert!(Args::try_parse_from(["npmeta", "--fetch-timeout", "0s", "ingest", "k"]).is_err());
        assert!(Args::try_parse_from(["npmeta", "--fetch-timeout", "soon", "ingest", "k"]).is_err());
    }

    #[test]
    fn test_parse_index_input() {
        let args = Args::parse_from(["npmeta", "--json", "index", "--input", "requests.jsonl"]);
        assert!(args.json);
        assert!(matches!(
            args.command,
            Commands::Index {
                input: Some(ref path),
            } if path == "requests.jsonl"
        ));
    }
}
