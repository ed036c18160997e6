//! Command-line and environment configuration.
//!
//! Every flag can also be set through an environment variable (or a `.env`
//! file, loaded before parsing). [`CliArgs`] is the raw input; [`ServerConfig`]
//! is the validated form the server runs with.

use axum::http::HeaderValue;
use cardstream_core::{
    DEFAULT_CONCURRENCY, DEFAULT_TOTAL, EmitterConfig, GeneratorConfig, Locale, PoolConfig,
    SessionConfig,
};
use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// JSON catalog the card names are drawn from.
    #[arg(long, env = "CATALOG_PATH", default_value = "data/catalog.json")]
    pub catalog_path: PathBuf,

    /// Locale of the card names (english, japanese, chinese or french).
    #[arg(long, env = "LOCALE", default_value = "french")]
    pub locale: String,

    /// Records generated per stream.
    #[arg(long, env = "TOTAL_RECORDS", default_value_t = DEFAULT_TOTAL)]
    pub total_records: usize,

    /// Generation tasks allowed in flight per stream.
    #[arg(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Minimum gap between two frames of one stream, in milliseconds.
    #[arg(long, env = "PACING_INTERVAL_MS", default_value_t = 20)]
    pub pacing_interval_ms: u64,

    /// Simulated latency of each generation task, in milliseconds.
    #[arg(long, env = "LATENCY_MS", default_value_t = 5)]
    pub latency_ms: u64,

    /// Upper bound of the random latency added per task, in milliseconds.
    #[arg(long, env = "LATENCY_JITTER_MS", default_value_t = 0)]
    pub latency_jitter_ms: u64,

    /// Seed for reproducible streams. Unseeded streams draw from OS entropy.
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// Encoded frames buffered between a session and its HTTP response body.
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,

    /// Comma separated CORS origins. `*` mirrors the request origin.
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "http://localhost:3000,*")]
    pub allowed_origins: String,

    /// Seconds to wait for active streams to close on shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

/// Origins allowed to open a stream from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Echo back whatever origin the request came from.
    Mirror,
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    /// Parses a comma separated origin list. A `*` anywhere in the list wins.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let origins: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect();

        if origins.is_empty() {
            anyhow::bail!("allowed_origins must name at least one origin");
        }
        if origins.contains(&"*") {
            return Ok(Self::Mirror);
        }

        let list = origins
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| anyhow::anyhow!("invalid origin '{origin}': {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        Ok(Self::List(list))
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub catalog_path: PathBuf,
    pub session: SessionConfig,
    pub stream_buffer_size: usize,
    pub allowed_origins: AllowedOrigins,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.total_records == 0 {
            anyhow::bail!("total_records must be greater than 0");
        }
        if args.concurrency == 0 {
            anyhow::bail!("concurrency must be greater than 0");
        }
        if args.concurrency > args.total_records {
            anyhow::bail!(
                "concurrency ({}) must not exceed total_records ({})",
                args.concurrency,
                args.total_records
            );
        }
        if args.stream_buffer_size == 0 {
            anyhow::bail!("stream_buffer_size must be greater than 0");
        }

        let locale: Locale = args.locale.parse()?;
        let session = SessionConfig {
            pool: PoolConfig::new(args.total_records, args.concurrency)?,
            emitter: EmitterConfig::new(Duration::from_millis(args.pacing_interval_ms)),
            generator: GeneratorConfig {
                latency: Duration::from_millis(args.latency_ms),
                jitter: Duration::from_millis(args.latency_jitter_ms),
                locale,
                seed: args.seed,
            },
        };

        Ok(Self {
            server_addr: args.server_addr,
            catalog_path: args.catalog_path,
            session,
            stream_buffer_size: args.stream_buffer_size,
            allowed_origins: AllowedOrigins::parse(&args.allowed_origins)?,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
