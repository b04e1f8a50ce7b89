//! Key/value flags that outlive a session (the console kept these in localStorage)

use super::{get_connection, DbResult};

pub fn get_table_sql() -> &'static str {
    "
    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    "
}

pub async fn get_app_state(key: &str) -> DbResult<Option<String>> {
    let conn = get_connection()?.lock().await;
    let mut rows = conn
        .query(
            "SELECT value FROM app_state WHERE key = ?1",
            turso::params![key],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// Insert or overwrite a flag
pub async fn set_app_state(key: &str, value: &str) -> DbResult<()> {
    let conn = get_connection()?.lock().await;
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = ?2",
        turso::params![key, value],
    )
    .await?;
    Ok(())
}

pub async fn delete_app_state(key: &str) -> DbResult<()> {
    let conn = get_connection()?.lock().await;
    conn.execute(
        "DELETE FROM app_state WHERE key = ?1",
        turso::params![key],
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn table_sql_declares_key_as_primary_key() {
        let sql = get_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS app_state"));
        assert!(sql.contains("key TEXT PRIMARY KEY"));
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_removes() {
        init_test_db().await;

        set_app_state("test_flag", "one").await.unwrap();
        set_app_state("test_flag", "two").await.unwrap();
        assert_eq!(
            get_app_state("test_flag").await.unwrap().as_deref(),
            Some("two")
        );

        delete_app_state("test_flag").await.unwrap();
        assert_eq!(get_app_state("test_flag").await.unwrap(), None);
    }
}
