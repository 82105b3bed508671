use std::time::Duration;

/// Config of a StickyResolver.
#[derive(clap::Args, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Maximum number of resolution engine calls made while resolving a single request.
    #[clap(
        long = "sticky-max-depth",
        env = "STICKY_MAX_DEPTH",
        default_value = "10"
    )]
    #[serde(default = "Config::default_max_depth")]
    pub max_depth: usize,
    /// Deadline for persisting the materialization updates of a resolution.
    #[clap(
        long = "sticky-write-timeout",
        env = "STICKY_WRITE_TIMEOUT",
        default_value = "30s"
    )]
    #[serde(default = "Config::default_write_timeout", with = "humantime_serde")]
    #[arg(value_parser = humantime::parse_duration)]
    pub write_timeout: Duration,
}

impl Config {
    fn default_max_depth() -> usize {
        10
    }
    fn default_write_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: Self::default_max_depth(),
            write_timeout: Self::default_write_timeout(),
        }
    }
}
