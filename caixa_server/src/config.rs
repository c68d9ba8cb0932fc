use std::env;

use caixa_common::parse_boolean_flag;
use chrono::{FixedOffset, Offset, Utc};
use log::*;

const DEFAULT_CAIXA_HOST: &str = "127.0.0.1";
const DEFAULT_CAIXA_PORT: u16 = 8580;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Maximum number of connections in the SQLite pool.
    pub max_db_connections: u32,
    /// If true, pending migrations are applied on startup.
    pub migrate_on_startup: bool,
    /// The offset from UTC at which the registers' business day ticks over.
    pub utc_offset: FixedOffset,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CAIXA_HOST.to_string(),
            port: DEFAULT_CAIXA_PORT,
            database_url: String::default(),
            max_db_connections: DEFAULT_MAX_CONNECTIONS,
            migrate_on_startup: true,
            utc_offset: Utc.fix(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CAIXA_HOST").ok().unwrap_or_else(|| DEFAULT_CAIXA_HOST.into());
        let port = env::var("CAIXA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CAIXA_PORT. {e} Using the default, {DEFAULT_CAIXA_PORT}, \
                         instead."
                    );
                    DEFAULT_CAIXA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CAIXA_PORT);
        let database_url = env::var("CAIXA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CAIXA_DATABASE_URL is not set. Please set it to the URL for the register database.");
            String::default()
        });
        let max_db_connections = env::var("CAIXA_MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for CAIXA_MAX_DB_CONNECTIONS. {e}");
                        e
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let migrate_on_startup = parse_boolean_flag(env::var("CAIXA_MIGRATE_ON_STARTUP").ok(), true);
        let utc_offset = env::var("CAIXA_UTC_OFFSET")
            .ok()
            .and_then(|s| {
                s.parse::<FixedOffset>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for CAIXA_UTC_OFFSET (expected e.g. -03:00). {e}");
                        e
                    })
                    .ok()
            })
            .unwrap_or_else(|| Utc.fix());
        Self { host, port, database_url, max_db_connections, migrate_on_startup, utc_offset }
    }
}
