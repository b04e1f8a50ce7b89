use std::path::Path;
use std::sync::OnceLock;
use tokio::sync::Mutex;
use turso::{Builder, Connection};

// One connection per process; access is serialized through the mutex
static DB_CONNECTION: OnceLock<Mutex<Connection>> = OnceLock::new();

pub(crate) type DbResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub mod app_state;

pub use app_state::{delete_app_state, get_app_state, set_app_state};

pub(crate) fn get_connection() -> DbResult<&'static Mutex<Connection>> {
    DB_CONNECTION
        .get()
        .ok_or_else(|| "Database not initialized".into())
}

/// Open (or create) the local state database and its tables.
pub async fn init_db(db_path: &Path) -> DbResult<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let path = db_path
        .to_str()
        .ok_or("Database path is not valid UTF-8")?;

    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;
    conn.execute_batch(app_state::get_table_sql()).await?;

    DB_CONNECTION
        .set(Mutex::new(conn))
        .map_err(|_| "Database already initialized")?;
    log::info!("state database opened at {}", db_path.display());

    Ok(())
}

#[cfg(test)]
lazy_static::lazy_static! {
    static ref TEST_DB: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::new();
}

/// Shared database for unit tests, created once per test binary.
#[cfg(test)]
pub(crate) async fn init_test_db() {
    TEST_DB
        .get_or_init(|| async {
            let path = std::env::temp_dir().join(format!(
                "objbrowser-test-{}.db",
                std::process::id()
            ));
            let _ = std::fs::remove_file(&path);
            init_db(&path).await.expect("failed to open test database");
        })
        .await;
}
