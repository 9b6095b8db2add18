//! Runtime configuration from CLI arguments and environment.

use std::{path::PathBuf, time::Duration};

use clap::Args;
use jiff::SignedDuration;
use tablecart::settings::{AppSettings, CartSettings, RatingSettings, SweeperSettings};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Args)]
pub(crate) struct AppConfig {
    /// Hours a new cart stays active before it expires
    #[arg(long, global = true, env = "CART_TTL_HOURS", default_value_t = 24)]
    pub cart_ttl_hours: u32,

    /// Seconds between expiration sweeps
    #[arg(long, global = true, env = "SWEEP_INTERVAL_SECONDS", default_value_t = 60)]
    pub sweep_interval_seconds: u64,

    /// Seconds expired and closed carts are kept past their expiration date
    #[arg(long, global = true, env = "SWEEP_RETENTION_SECONDS", default_value_t = 0)]
    pub sweep_retention_seconds: u32,

    /// Hours a cached average rating stays fresh
    #[arg(long, global = true, env = "RATING_CACHE_TTL_HOURS", default_value_t = 12)]
    pub rating_cache_ttl_hours: u32,

    /// JSON file with menu items and carts to load at startup
    #[arg(long, global = true, env = "SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub(crate) fn settings(&self) -> AppSettings {
        AppSettings {
            carts: CartSettings {
                ttl: SignedDuration::from_hours(i64::from(self.cart_ttl_hours)),
            },
            sweeper: SweeperSettings {
                interval: Duration::from_secs(self.sweep_interval_seconds),
                retention: SignedDuration::from_secs(i64::from(self.sweep_retention_seconds)),
            },
            ratings: RatingSettings {
                ttl: SignedDuration::from_hours(i64::from(self.rating_cache_ttl_hours)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        config: AppConfig,
    }

    #[test]
    fn defaults_match_library_settings() {
        let harness = Harness::parse_from(["tablecart"]);

        assert_eq!(harness.config.settings(), AppSettings::default());
        assert_eq!(harness.config.logging.log_format, LogFormat::Compact);
    }

    #[test]
    fn flags_override_defaults() {
        let harness = Harness::parse_from([
            "tablecart",
            "--cart-ttl-hours",
            "2",
            "--sweep-interval-seconds",
            "5",
            "--sweep-retention-seconds",
            "3600",
            "--log-format",
            "json",
        ]);

        let settings = harness.config.settings();

        assert_eq!(settings.carts.ttl, SignedDuration::from_hours(2));
        assert_eq!(settings.sweeper.interval, Duration::from_secs(5));
        assert_eq!(settings.sweeper.retention, SignedDuration::from_hours(1));
        assert_eq!(harness.config.logging.log_format, LogFormat::Json);
    }
}
