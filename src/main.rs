//! CLI entry point for the fetchkit tool.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fetchkit_core::{
    ClientConfig, DisplayFlags, DownloadRequest, FetchError, Fetcher, QueryRequest, WorkStatus,
};
use tracing::{debug, error, info};

mod cli;
mod cli_config;

use cli::{Args, Command, DownloadArgs, QueryArgs};
use cli_config::FileConfig;

fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let code = err
                .downcast_ref::<FetchError>()
                .map_or(1, |e| e.kind().code());
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(args: Args) -> Result<()> {
    let file_config = cli_config::load_file_config(args.config.as_deref())?;
    match args.command {
        Command::Download(download) => run_download(&file_config, download),
        Command::Query(query) => run_query(&file_config, &query),
    }
}

/// Builds the client configuration: file values first, CLI flags on top.
fn client_config(
    file: &FileConfig,
    user_agent: Option<&str>,
    max_redirects: Option<u32>,
) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(user_agent) = user_agent.or(file.user_agent.as_deref()) {
        config = config.with_user_agent(user_agent);
    }
    if let Some(max_redirects) = max_redirects.or(file.max_redirects) {
        config = config.with_max_redirects(max_redirects);
    }
    let connect = file
        .connect_timeout_secs
        .map_or(config.connect_timeout, Duration::from_secs);
    let read = file
        .read_timeout_secs
        .map_or(config.read_timeout, Duration::from_secs);
    config.with_timeouts(connect, read)
}

fn run_download(file: &FileConfig, args: DownloadArgs) -> Result<()> {
    let config = client_config(file, args.user_agent.as_deref(), args.max_redirects);
    let fetcher = Fetcher::with_config(config)?;

    let output_dir = args
        .output_dir
        .or_else(|| file.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut request = DownloadRequest::new(args.url, output_dir)
        .with_force(args.force)
        .with_progress(args.progress)
        .with_log(args.log)
        .with_display_flags(DisplayFlags::default() | DisplayFlags::ELAPSED);
    if let Some(name) = args.name {
        request = request.with_file_name(name);
    }

    let outcome = fetcher.download(request)?;
    match outcome.status {
        WorkStatus::Completed => info!(
            path = %outcome.path.display(),
            bytes = outcome.progress.downloaded,
            "Downloaded"
        ),
        WorkStatus::Skipped => info!(path = %outcome.path.display(), "Up to date, skipped"),
    }
    Ok(())
}

fn run_query(file: &FileConfig, args: &QueryArgs) -> Result<()> {
    let config = client_config(file, args.user_agent.as_deref(), None);
    let fetcher = Fetcher::with_config(config)?;

    let mut request = QueryRequest::new(args.url.as_str())
        .with_verb(args.verb.as_str())
        .with_log(args.log)
        .with_max_redirects(args.max_redirects.unwrap_or(0));
    if let Some(body) = &args.body {
        request = request.with_body(body.as_bytes(), args.content_type.as_deref());
    } else if let Some(content_type) = &args.content_type {
        request.content_type = Some(content_type.clone());
    }
    for header in &args.headers {
        match header.split_once(':') {
            Some((name, value)) => request = request.with_header(name.trim(), value.trim()),
            None => anyhow::bail!("Invalid header `{header}`. Expected `Name: value`"),
        }
    }

    let response = fetcher.query_with(&request)?;
    let mut stdout = io::stdout().lock();
    if args.include {
        writeln!(stdout, "{}", response.status())?;
    }
    stdout.write_all(response.body())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_flags_override_file() {
        let file = FileConfig {
            user_agent: Some("from-file/1.0".to_string()),
            max_redirects: Some(2),
            connect_timeout_secs: Some(5),
            ..FileConfig::default()
        };
        let config = client_config(&file, Some("from-flag/2.0"), None);
        assert_eq!(config.user_agent, "from-flag/2.0");
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(300));

        let config = client_config(&file, None, Some(0));
        assert_eq!(config.user_agent, "from-file/1.0");
        assert_eq!(config.max_redirects, 0);
    }
}
