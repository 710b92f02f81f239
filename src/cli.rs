//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use plugin_mirror::{
    DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, MirrorConfig,
};

/// Mirror a JetBrains plugin repository into a local directory.
///
/// Fetches the plugin listing for each target build, merges them, and
/// downloads every release (plus icons) into a slugged directory tree with a
/// `plugins/repository.xml` manifest. Re-runs skip files already present.
#[derive(Parser, Debug)]
#[command(name = "plugin-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Output directory for the mirror tree
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target product builds, e.g. IC-241.14494 (repeat or comma-separate)
    #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
    pub builds: Vec<String>,

    /// Mirror every historical release of each listed plugin
    #[arg(short = 'a', long)]
    pub mirror_all_versions: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum requests started per second (0 to disable)
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT as u16, value_parser = clap::value_parser!(u16).range(0..=10_000))]
    pub rate_limit: u16,

    /// Per-request timeout in seconds (1-600)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Releases downloaded per batch in all-versions mode (1-256)
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE as u16, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub batch_size: u16,

    /// Repository base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Maps the arguments onto a session config.
    #[must_use]
    pub fn to_config(&self) -> MirrorConfig {
        let mut config = MirrorConfig::new(&self.output, self.builds.clone());
        config.mirror_all_versions = self.mirror_all_versions;
        config.rate_limit = usize::from(self.rate_limit);
        config.request_timeout = Duration::from_secs(self.timeout);
        config.max_retries = u32::from(self.max_retries);
        config.batch_size = usize::from(self.batch_size);
        config.base_url.clone_from(&self.base_url);
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE: [&str; 5] = ["plugin-mirror", "-o", "/mirror", "-b", "IC-241.1"];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(BASE.iter().chain(extra).copied())
    }

    #[test]
    fn test_cli_minimal_args_use_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.output, PathBuf::from("/mirror"));
        assert_eq!(args.builds, vec!["IC-241.1"]);
        assert!(!args.mirror_all_versions);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.rate_limit, 128);
        assert_eq!(args.timeout, 5);
        assert_eq!(args.max_retries, 6);
        assert_eq!(args.batch_size, 16);
        assert_eq!(args.base_url, "https://plugins.jetbrains.com");
        assert!(!args.json);
    }

    #[test]
    fn test_cli_output_is_required() {
        let result = Args::try_parse_from(["plugin-mirror", "-b", "IC-241.1"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_builds_are_required() {
        let result = Args::try_parse_from(["plugin-mirror", "-o", "/mirror"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["plugin-mirror", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["plugin-mirror", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = parse(&["--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Build List Tests ====================

    #[test]
    fn test_cli_builds_accept_several_values() {
        let args = Args::try_parse_from([
            "plugin-mirror", "-o", "/m", "-b", "IC-241.1", "IU-241.1",
        ])
        .unwrap();
        assert_eq!(args.builds, vec!["IC-241.1", "IU-241.1"]);
    }

    #[test]
    fn test_cli_builds_accept_commas_and_repeats() {
        let args = Args::try_parse_from([
            "plugin-mirror", "-o", "/m", "--builds", "IC-241.1,IU-241.1", "-b", "RD-191.7141.355",
        ])
        .unwrap();
        assert_eq!(args.builds, vec!["IC-241.1", "IU-241.1", "RD-191.7141.355"]);
    }

    // ==================== Flag Tests ====================

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(parse(&["-v"]).unwrap().verbose, 1);
        assert_eq!(parse(&["-vv"]).unwrap().verbose, 2);
        assert_eq!(parse(&["--verbose", "--verbose"]).unwrap().verbose, 2);
    }

    #[test]
    fn test_cli_quiet_and_json_flags() {
        let args = parse(&["-q", "--json", "-a"]).unwrap();
        assert!(args.quiet);
        assert!(args.json);
        assert!(args.mirror_all_versions);
    }

    #[test]
    fn test_cli_rate_limit_zero_disables() {
        assert_eq!(parse(&["--rate-limit", "0"]).unwrap().rate_limit, 0);
    }

    #[test]
    fn test_cli_rate_limit_over_max_rejected() {
        let err = parse(&["--rate-limit", "10001"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let err = parse(&["--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_retries_over_max_rejected() {
        let err = parse(&["-r", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_batch_size_zero_rejected() {
        let err = parse(&["--batch-size", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Config Mapping Tests ====================

    #[test]
    fn test_cli_maps_onto_config() {
        let args = parse(&[
            "-a",
            "--rate-limit",
            "10",
            "--timeout",
            "30",
            "-r",
            "2",
            "--batch-size",
            "4",
            "--base-url",
            "https://mirror.example.com/repo",
        ])
        .unwrap();

        let config = args.to_config();
        assert_eq!(config.output_dir, PathBuf::from("/mirror"));
        assert_eq!(config.builds, vec!["IC-241.1"]);
        assert!(config.mirror_all_versions);
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.base_url, "https://mirror.example.com/repo");
        assert!(config.validate().is_ok());
    }
}
