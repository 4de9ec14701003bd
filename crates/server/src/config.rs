use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use facemood_core::detection::domain::face_detector::DetectionParams;
use facemood_core::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use facemood_core::shared::constants::{
    DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR, DEFAULT_TRUSTED_ORIGIN,
};

/// Facial emotion recognition over HTTP.
#[derive(Parser, Debug)]
#[command(name = "facemood", version)]
pub struct Cli {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default). Serve options may follow the subcommand.
    Serve,
    /// Create or replace an account in the account store.
    AddAccount(AddAccountArgs),
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// SQLite database file holding accounts.
    #[arg(long, global = true, env = "DB_NAME", default_value = "facemood.db")]
    pub db_name: PathBuf,

    /// Accepted for deployment compatibility; not used by the SQLite store.
    #[arg(long, global = true, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Accepted for deployment compatibility; not used by the SQLite store.
    #[arg(long, global = true, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Accepted for deployment compatibility; not used by the SQLite store.
    #[arg(long, global = true, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Accepted for deployment compatibility; not used by the SQLite store.
    #[arg(long, global = true, env = "DB_PORT")]
    pub db_port: Option<u16>,
}

impl DatabaseArgs {
    /// Names of the network database settings that were supplied.
    pub fn ignored_settings(&self) -> Vec<&'static str> {
        [
            ("DB_USER", self.db_user.is_some()),
            ("DB_PASSWORD", self.db_password.is_some()),
            ("DB_HOST", self.db_host.is_some()),
            ("DB_PORT", self.db_port.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, global = true, env = "FACEMOOD_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Origins allowed to call /predict without credentials (comma-separated).
    #[arg(
        long,
        global = true,
        env = "TRUSTED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_TRUSTED_ORIGIN
    )]
    pub trusted_origins: Vec<String>,

    /// Face detector ONNX model (defaults to the model cache directory).
    #[arg(long, global = true, env = "FACEMOOD_DETECTOR_MODEL")]
    pub detector_model: Option<PathBuf>,

    /// Emotion classifier ONNX model (defaults to the model cache directory).
    #[arg(long, global = true, env = "FACEMOOD_EMOTION_MODEL")]
    pub emotion_model: Option<PathBuf>,

    /// Ratio between successive detection window sizes (> 1).
    #[arg(long, global = true, env = "FACEMOOD_SCALE_FACTOR", default_value_t = DEFAULT_SCALE_FACTOR)]
    pub scale_factor: f64,

    /// Overlapping candidates a face needs before it is reported.
    #[arg(long, global = true, env = "FACEMOOD_MIN_NEIGHBORS", default_value_t = DEFAULT_MIN_NEIGHBORS)]
    pub min_neighbors: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, env = "FACEMOOD_DETECTOR_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE)]
    pub detector_confidence: f64,

    /// Keep serving when models fail to load and report 503 on /status.
    #[arg(
        long,
        global = true,
        env = "FACEMOOD_STRICT_HEALTH_CHECK",
        value_parser = BoolishValueParser::new()
    )]
    pub strict_health_check: bool,

    /// Authorization deadline in milliseconds.
    #[arg(long, global = true, env = "FACEMOOD_AUTH_TIMEOUT_MS", default_value = "5000")]
    pub auth_timeout_ms: u64,

    /// Inference deadline in milliseconds.
    #[arg(long, global = true, env = "FACEMOOD_INFERENCE_TIMEOUT_MS", default_value = "30000")]
    pub inference_timeout_ms: u64,

    /// Maximum request body size in bytes.
    #[arg(long, global = true, env = "FACEMOOD_BODY_LIMIT", default_value = "10485760")]
    pub body_limit: usize,
}

impl ServeArgs {
    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
        }
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[derive(Args, Debug)]
pub struct AddAccountArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long, env = "FACEMOOD_ACCOUNT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// API key that authorizes requests for this account.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Start a trial now (first week active).
    #[arg(long)]
    pub trial: bool,

    /// Start a trial at this RFC 3339 timestamp instead of now.
    #[arg(long, conflicts_with = "trial")]
    pub purchased_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::{CommandFactory, FromArgMatches};
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("facemood").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = parse(&["--bind", "0.0.0.0:8080"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.bind, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn test_serve_subcommand_accepts_serve_flags() {
        let cli = parse(&["serve", "--bind", "0.0.0.0:9000", "--min-neighbors", "2"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
        assert_eq!(cli.serve.bind, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(cli.serve.min_neighbors, 2);
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli = parse(&[
            "add-account",
            "--username",
            "alice",
            "--password",
            "pw",
            "--db-name",
            "other.db",
        ]);
        assert!(matches!(cli.command, Some(Command::AddAccount(_))));
        assert_eq!(cli.database.db_name, PathBuf::from("other.db"));
    }

    /// Parses `raw` the way an environment value for the flag is parsed.
    fn strict_health_check_from(raw: &'static str) -> Result<bool, clap::Error> {
        let mut cmd = Cli::command().mut_arg("strict_health_check", |arg| arg.default_value(raw));
        let matches = cmd.try_get_matches_from_mut(["facemood"])?;
        Ok(Cli::from_arg_matches(&matches)?.serve.strict_health_check)
    }

    #[rstest]
    #[case("1", true)]
    #[case("yes", true)]
    #[case("true", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("off", false)]
    #[case("false", false)]
    fn test_strict_health_check_accepts_boolish_values(
        #[case] raw: &'static str,
        #[case] expected: bool,
    ) {
        assert_eq!(strict_health_check_from(raw).unwrap(), expected);
    }

    #[test]
    fn test_strict_health_check_flag_alone_enables() {
        assert!(parse(&["--strict-health-check"]).serve.strict_health_check);
        assert!(!parse(&[]).serve.strict_health_check);
    }

    #[test]
    fn test_account_password_reads_hidden_env() {
        let cmd = Cli::command();
        let add_account = cmd.find_subcommand("add-account").unwrap();
        let password = add_account
            .get_arguments()
            .find(|arg| arg.get_id() == "password")
            .unwrap();
        assert_eq!(
            password.get_env(),
            Some(std::ffi::OsStr::new("FACEMOOD_ACCOUNT_PASSWORD"))
        );
        assert!(password.is_hide_env_values_set());
    }

    #[test]
    fn test_trusted_origins_are_comma_separated() {
        let cli = parse(&["--trusted-origins", "http://a.test,https://b.test"]);
        assert_eq!(
            cli.serve.trusted_origins,
            vec!["http://a.test".to_string(), "https://b.test".to_string()]
        );
    }

    #[test]
    fn test_detection_params_from_flags() {
        let cli = parse(&["--scale-factor", "1.1", "--min-neighbors", "3"]);
        let params = cli.serve.detection_params();
        assert_eq!(params.scale_factor, 1.1);
        assert_eq!(params.min_neighbors, 3);
    }

    #[test]
    fn test_timeouts_in_milliseconds() {
        let cli = parse(&["--auth-timeout-ms", "250", "--inference-timeout-ms", "1500"]);
        assert_eq!(cli.serve.auth_timeout(), Duration::from_millis(250));
        assert_eq!(cli.serve.inference_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_add_account_with_purchase_time() {
        let cli = parse(&[
            "add-account",
            "--username",
            "alice",
            "--password",
            "pw",
            "--purchased-at",
            "2024-02-01T12:00:00Z",
        ]);
        let Some(Command::AddAccount(args)) = cli.command else {
            panic!("expected add-account");
        };
        assert_eq!(args.username, "alice");
        assert_eq!(
            args.purchased_at,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap())
        );
        assert!(!args.trial);
    }

    #[test]
    fn test_trial_conflicts_with_purchased_at() {
        let result = Cli::try_parse_from([
            "facemood",
            "add-account",
            "--username",
            "a",
            "--password",
            "b",
            "--trial",
            "--purchased-at",
            "2024-02-01T12:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ignored_settings_lists_supplied_values() {
        let cli = parse(&["--db-user", "app", "--db-port", "5432"]);
        assert_eq!(cli.database.ignored_settings(), vec!["DB_USER", "DB_PORT"]);
    }
}
