use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use crate::store::memgraph::MemgraphConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphBackend {
    Memory,
    Memgraph,
}

impl FromStr for GraphBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(GraphBackend::Memory),
            "memgraph" => Ok(GraphBackend::Memgraph),
            other => anyhow::bail!("unknown GRAPH_BACKEND {other:?} (expected memory or memgraph)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: GraphBackend,
    pub memgraph: MemgraphConfig,
    /// Zero means "available parallelism".
    pub extract_workers: usize,
    pub extra_excluded_dirs: Vec<String>,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_port: u16 = env_parse("API_PORT", 8080);
        let bind_host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr: SocketAddr = format!("{bind_host}:{api_port}").parse()?;

        let backend = match env::var("GRAPH_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => GraphBackend::Memory,
        };

        let defaults = MemgraphConfig::default();
        let memgraph = MemgraphConfig {
            uri: env::var("MEMGRAPH_URI").unwrap_or(defaults.uri),
            username: env::var("MEMGRAPH_USERNAME").unwrap_or(defaults.username),
            password: env::var("MEMGRAPH_PASSWORD").unwrap_or(defaults.password),
            database: env::var("MEMGRAPH_DATABASE").unwrap_or(defaults.database),
            max_connections: env_parse("MEMGRAPH_MAX_CONNECTION_POOL_SIZE", defaults.max_connections),
            connect_timeout: Duration::from_millis(env_parse("MEMGRAPH_CONNECT_TIMEOUT_MS", 15_000)),
            query_timeout: Duration::from_millis(env_parse("MEMGRAPH_QUERY_TIMEOUT_MS", 30_000)),
        };

        let extra_excluded_dirs = env::var("EXTRA_EXCLUDED_DIRS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            backend,
            memgraph,
            extract_workers: env_parse("EXTRACT_WORKERS", 0),
            extra_excluded_dirs,
        })
    }
}
