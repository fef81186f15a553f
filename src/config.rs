use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Path to the SQLite database file (":memory:" for an in-memory store)
    #[clap(long, env = "ROWBASE_DATABASE_PATH", default_value = "rowbase.db")]
    pub database_path: String,

    /// Logging level
    #[clap(long, env = "ROWBASE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Number of DB connections in the pool
    #[clap(long, env = "ROWBASE_DB_POOL_SIZE", default_value_t = 10)]
    pub db_pool_size: u32,

    /// Maximum related rows embedded per parent per relation
    #[clap(long, env = "ROWBASE_INCLUDE_FANOUT", default_value_t = 50)]
    pub include_fanout: u32,

    /// Relation expansion depth; 0 disables relation inclusion entirely
    #[clap(long, env = "ROWBASE_INCLUDE_DEPTH", default_value_t = 1)]
    pub include_depth: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "rowbase.db".to_string(),
            log_level: "info".to_string(),
            db_pool_size: 10,
            include_fanout: 50,
            include_depth: 1,
        }
    }
}
