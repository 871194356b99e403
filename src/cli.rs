//! Command Line Interface (CLI) arguments.
//!
//! Every option may also be supplied through an `AIRWATCH_*` environment variable. Arguments are
//! parsed and validated once at startup and then passed to the components that need them.

use clap::builder::{NonEmptyStringValueParser, RangedU64ValueParser};
use clap::Parser;
use url::Url;

/// Airwatch command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "AIRWATCH_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "AIRWATCH_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "AIRWATCH_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/airwatch/certs/cert.pem",
        env = "AIRWATCH_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/airwatch/certs/key.pem",
        env = "AIRWATCH_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "AIRWATCH_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "AIRWATCH_ENABLE_JAEGER")]
    pub enable_jaeger: bool,

    /// Bucket holding the sensor data
    #[arg(long, env = "AIRWATCH_S3_BUCKET", value_parser = NonEmptyStringValueParser::new())]
    pub s3_bucket: String,
    /// Region of the bucket
    #[arg(long, default_value = "ap-northeast-2", env = "AIRWATCH_S3_REGION")]
    pub s3_region: String,
    /// URL of an S3-compatible object store. Uses AWS when unset.
    #[arg(long, env = "AIRWATCH_S3_ENDPOINT")]
    pub s3_endpoint: Option<Url>,
    /// Access key for the object store. Uses the default credential chain when unset.
    #[arg(long, env = "AIRWATCH_S3_ACCESS_KEY", requires = "s3_secret_key")]
    pub s3_access_key: Option<String>,
    /// Secret key for the object store
    #[arg(long, env = "AIRWATCH_S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: Option<String>,
    /// Maximum number of keys returned by a single listing
    #[arg(
        long,
        default_value_t = 1000,
        env = "AIRWATCH_S3_MAX_KEYS",
        value_parser = clap::value_parser!(i32).range(1..=1000)
    )]
    pub s3_max_keys: i32,
    /// Time limit in seconds for each object store call
    #[arg(
        long,
        default_value_t = 10,
        env = "AIRWATCH_S3_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub s3_timeout: u64,
    /// Maximum number of object store requests in flight for one API request
    #[arg(
        long,
        default_value_t = 32,
        env = "AIRWATCH_S3_CONNECTION_LIMIT",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub s3_connection_limit: usize,

    /// Cache max-age in seconds for responses about the latest data
    #[arg(long, default_value_t = 30, env = "AIRWATCH_LATEST_MAX_AGE")]
    pub latest_max_age: u64,
    /// Cache max-age in seconds for responses about historical data
    #[arg(long, default_value_t = 3600, env = "AIRWATCH_HISTORY_MAX_AGE")]
    pub history_max_age: u64,

    /// AWS account owning the QuickSight dashboards. Dashboards are disabled when unset.
    #[arg(long, env = "AIRWATCH_QUICKSIGHT_ACCOUNT_ID")]
    pub quicksight_account_id: Option<String>,
    /// Region of the QuickSight account
    #[arg(long, default_value = "ap-northeast-2", env = "AIRWATCH_QUICKSIGHT_REGION")]
    pub quicksight_region: String,
    /// QuickSight namespace used for anonymous embedding
    #[arg(long, default_value = "default", env = "AIRWATCH_QUICKSIGHT_NAMESPACE")]
    pub quicksight_namespace: String,
    /// Lifetime in minutes of generated embed URLs
    #[arg(
        long,
        default_value_t = 600,
        env = "AIRWATCH_EMBED_SESSION_MINUTES",
        value_parser = clap::value_parser!(i64).range(15..=600)
    )]
    pub embed_session_minutes: i64,
    /// Time limit in seconds for each dashboard service call
    #[arg(
        long,
        default_value_t = 10,
        env = "AIRWATCH_DASHBOARD_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub dashboard_timeout: u64,

    /// Interpreter used to run the chat helper script
    #[arg(long, default_value = "python3", env = "AIRWATCH_CHAT_INTERPRETER")]
    pub chat_interpreter: String,
    /// Path to the chat helper script. Chat is disabled when unset.
    #[arg(long, env = "AIRWATCH_CHAT_SCRIPT")]
    pub chat_script: Option<String>,
    /// Time limit in seconds for one chat helper run
    #[arg(
        long,
        default_value_t = 60,
        env = "AIRWATCH_CHAT_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub chat_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
