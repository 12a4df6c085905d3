//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch files and query endpoints over HTTP, HTTPS, and FTP.
#[derive(Parser, Debug)]
#[command(name = "fetchkit")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a URL to a file, skipping it if the local copy is current
    Download(DownloadArgs),
    /// Send a request and print the response body
    Query(QueryArgs),
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// URL to download (http, https, or ftp)
    pub url: String,

    /// Directory to save into (defaults to config `output_dir`, then `.`)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name to save as instead of the derived one
    #[arg(short, long)]
    pub name: Option<String>,

    /// Download even if the local file looks current
    #[arg(short, long)]
    pub force: bool,

    /// Show a progress line on stderr
    #[arg(short, long)]
    pub progress: bool,

    /// Log request and response headers
    #[arg(long)]
    pub log: bool,

    /// Maximum redirects to follow (0-32)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=32))]
    pub max_redirects: Option<u32>,

    /// User-Agent header to send
    #[arg(long)]
    pub user_agent: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// URL to query (http or https)
    pub url: String,

    /// HTTP verb
    #[arg(short = 'X', long = "request", default_value = "GET")]
    pub verb: String,

    /// Request body
    #[arg(short = 'd', long = "data")]
    pub body: Option<String>,

    /// Content-Type for the request body
    #[arg(long)]
    pub content_type: Option<String>,

    /// Extra header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Print the status code before the body
    #[arg(short, long)]
    pub include: bool,

    /// Log request and response headers
    #[arg(long)]
    pub log: bool,

    /// Maximum redirects to follow (0-32, 0 uses the default)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=32))]
    pub max_redirects: Option<u32>,

    /// User-Agent header to send
    #[arg(long)]
    pub user_agent: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn download_args(args: Args) -> DownloadArgs {
        match args.command {
            Command::Download(download) => download,
            Command::Query(_) => panic!("expected download subcommand"),
        }
    }

    fn query_args(args: Args) -> QueryArgs {
        match args.command {
            Command::Query(query) => query,
            Command::Download(_) => panic!("expected query subcommand"),
        }
    }

    #[test]
    fn test_cli_download_defaults() {
        let args = Args::try_parse_from(["fetchkit", "download", "https://example.com/a.zip"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        let download = download_args(args);
        assert_eq!(download.url, "https://example.com/a.zip");
        assert!(download.output_dir.is_none());
        assert!(!download.force);
        assert!(!download.progress);
        assert!(download.max_redirects.is_none());
    }

    #[test]
    fn test_cli_download_flags() {
        let args = Args::try_parse_from([
            "fetchkit",
            "download",
            "-o",
            "/tmp/out",
            "-n",
            "file.bin",
            "-f",
            "-p",
            "--log",
            "--max-redirects",
            "2",
            "https://example.com/a.zip",
        ])
        .unwrap();
        let download = download_args(args);
        assert_eq!(download.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(download.name.as_deref(), Some("file.bin"));
        assert!(download.force);
        assert!(download.progress);
        assert!(download.log);
        assert_eq!(download.max_redirects, Some(2));
    }

    #[test]
    fn test_cli_max_redirects_over_max_rejected() {
        let result = Args::try_parse_from([
            "fetchkit",
            "download",
            "--max-redirects",
            "33",
            "https://example.com/",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_query_defaults_to_get() {
        let args = Args::try_parse_from(["fetchkit", "query", "https://example.com/api"]).unwrap();
        let query = query_args(args);
        assert_eq!(query.verb, "GET");
        assert!(query.headers.is_empty());
        assert!(query.body.is_none());
    }

    #[test]
    fn test_cli_query_repeated_headers() {
        let args = Args::try_parse_from([
            "fetchkit",
            "query",
            "-X",
            "POST",
            "-d",
            "{}",
            "--content-type",
            "application/json",
            "-H",
            "X-A: 1",
            "-H",
            "X-B: 2",
            "https://example.com/api",
        ])
        .unwrap();
        let query = query_args(args);
        assert_eq!(query.verb, "POST");
        assert_eq!(query.body.as_deref(), Some("{}"));
        assert_eq!(query.content_type.as_deref(), Some("application/json"));
        assert_eq!(query.headers, vec!["X-A: 1", "X-B: 2"]);
    }

    #[test]
    fn test_cli_global_verbosity_after_subcommand() {
        let args = Args::try_parse_from(["fetchkit", "query", "-vv", "https://example.com/"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["fetchkit"]).is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["fetchkit", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_unknown_scheme_is_not_a_parse_error() {
        // scheme validation happens in the library, not in argument parsing
        let args = Args::try_parse_from(["fetchkit", "download", "gopher://example.com/"]);
        assert!(args.is_ok());
    }
}
