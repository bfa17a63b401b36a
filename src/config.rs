use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Settings of a lease server. Build with [`ServerConfig::builder`] or from
/// the command line via [`Cli`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Upper bound for the duration of a lease request, in ms.
    pub max_lease_duration_ms: i64,
    /// Upper bound for the duration of a renewal, in ms.
    pub max_lease_extension_duration_ms: i64,
    /// How often idle gates are dropped; `None` keeps them forever.
    pub compact_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::builder().build()
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

pub struct ServerConfigBuilder {
    bind: SocketAddr,
    max_lease_duration_ms: i64,
    max_lease_extension_duration_ms: i64,
    compact_interval_ms: u64,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_lease_duration_ms: i64::MAX,
            max_lease_extension_duration_ms: i64::MAX,
            compact_interval_ms: 0,
        }
    }
}

impl ServerConfigBuilder {
    pub fn new() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn bind(mut self, bind: SocketAddr) -> ServerConfigBuilder {
        self.bind = bind;
        self
    }

    pub fn max_lease_duration_ms(mut self, ms: i64) -> ServerConfigBuilder {
        self.max_lease_duration_ms = ms;
        self
    }

    pub fn max_lease_extension_duration_ms(mut self, ms: i64) -> ServerConfigBuilder {
        self.max_lease_extension_duration_ms = ms;
        self
    }

    /// 0 disables compaction.
    pub fn compact_interval_ms(mut self, ms: u64) -> ServerConfigBuilder {
        self.compact_interval_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            max_lease_duration_ms: self.max_lease_duration_ms,
            max_lease_extension_duration_ms: self.max_lease_extension_duration_ms,
            compact_interval: (self.compact_interval_ms > 0)
                .then(|| Duration::from_millis(self.compact_interval_ms)),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "elysees-server", version, about = "Named-lease coordination server")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "ELYSEES_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Longest lease a client may request, in ms
    #[arg(long, env = "ELYSEES_MAX_LEASE_DURATION", default_value_t = i64::MAX)]
    pub max_lease_duration: i64,

    /// Longest renewal a client may request, in ms
    #[arg(long, env = "ELYSEES_MAX_LEASE_EXTENSION_DURATION", default_value_t = i64::MAX)]
    pub max_lease_extension_duration: i64,

    /// Interval for dropping gates of released leases, in ms (0 = never)
    #[arg(long, env = "ELYSEES_COMPACT_INTERVAL", default_value_t = 0)]
    pub compact_interval: u64,
}

impl Cli {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig::builder()
            .bind(self.bind)
            .max_lease_duration_ms(self.max_lease_duration)
            .max_lease_extension_duration_ms(self.max_lease_extension_duration)
            .compact_interval_ms(self.compact_interval)
            .build()
    }
}
