use std::{env, fs, sync::PoisonError};

use clap::Parser;
use cli::Args;
use index::serve_index_requests;
use ingest::ingest_locators;
use logging::setup_logging;
use npmeta_config::config::{self, config_path, generate_default_config, get_config, set_config_path, Config};
use npmeta_dl::http_client::{parse_headers, ClientConfig};
use npmeta_operations::{
    error::ErrorContext, NpmetaContext, NpmetaError, NpmetaResult,
};
use npmeta_utils::path::resolve_path;
use show::show_package;
use tracing::{debug, info, warn};
use ureq::Proxy;
use utils::{expand_stdin_args, COLOR};

mod cli;
mod index;
mod ingest;
mod logging;
mod show;
mod utils;

/// HTTP settings given on the command line.
fn client_config(args: &Args) -> NpmetaResult<ClientConfig> {
    let proxy = args
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .map_err(|err| NpmetaError::Custom(format!("Invalid proxy: {err}")))?;

    Ok(ClientConfig {
        user_agent: args.user_agent.clone(),
        headers: args.header.as_deref().map(parse_headers),
        proxy,
        timeout: args.fetch_timeout,
        ..ClientConfig::default()
    })
}

fn print_config() -> NpmetaResult<()> {
    let config_path = config_path();
    let content = match fs::read_to_string(&config_path) {
        Ok(v) => v,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} not found", config_path.display());
            let config = get_config();
            toml::to_string_pretty(&config)
                .map_err(|err| NpmetaError::Custom(format!("Failed to render config: {err}")))?
        }
        Err(err) => {
            return Err(NpmetaError::IoError {
                action: "reading config".to_string(),
                source: err,
            });
        }
    };
    info!("{}", content);
    Ok(())
}

async fn handle_cli() -> NpmetaResult<()> {
    let args = expand_stdin_args(env::args().collect(), std::io::stdin());
    let args = Args::parse_from(args);

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap_or_else(PoisonError::into_inner);
        *color = false;
    }

    if let Some(ref c) = args.config {
        let path = resolve_path(c).map_err(npmeta_config::error::ConfigError::from)?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .with_context(|| "retrieving current directory".into())?
                .join(path)
        };
        set_config_path(path);
    }

    match args.command {
        cli::Commands::DefConfig => generate_default_config()?,
        ref command => {
            config::init()?;
            let config: Config = get_config();
            debug!(config_path = %config_path().display(), "configuration loaded");

            match command {
                cli::Commands::Config => print_config()?,
                cli::Commands::Ingest {
                    locators,
                } => {
                    let ctx = NpmetaContext::from_config(&config, client_config(&args)?)?;
                    ingest_locators(&ctx, locators.clone(), args.json).await?;
                }
                cli::Commands::Index {
                    input,
                } => {
                    let ctx = NpmetaContext::from_config(&config, client_config(&args)?)?;
                    serve_index_requests(&ctx, input.clone()).await?;
                }
                cli::Commands::Show {
                    name,
                } => {
                    let ctx = NpmetaContext::from_config(&config, client_config(&args)?)?;
                    show_package(&ctx, name, args.json).await?;
                }
                cli::Commands::DefConfig => {}
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Install miette's fancy error handler for beautiful error output
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
