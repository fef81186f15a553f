use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::debug;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_pool(database_path: &str, max_size: u32) -> DbPool {
    debug!(
        message = "Initialising connection pool",
        database_path = database_path,
        max_size = max_size,
    );

    let manager = if database_path == ":memory:" {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(database_path)
    };

    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .expect("Failed to create pool")
}
