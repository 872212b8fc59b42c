use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // User Preferences
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use a dotted convention: `theme.choice`, `session.view`.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT).
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_preference_missing() {
        let db = test_db().await;
        assert_eq!(db.get_preference("theme.choice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_preference_upsert() {
        let db = test_db().await;
        db.set_preference("theme.choice", "dark").await.unwrap();
        assert_eq!(
            db.get_preference("theme.choice").await.unwrap(),
            Some("dark".to_string())
        );

        db.set_preference("theme.choice", "light").await.unwrap();
        assert_eq!(
            db.get_preference("theme.choice").await.unwrap(),
            Some("light".to_string())
        );

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_preferences")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let db = test_db().await;
        db.set_preference("theme.choice", "dark").await.unwrap();
        db.set_preference("session.view", "feeds").await.unwrap();
        assert_eq!(
            db.get_preference("session.view").await.unwrap().as_deref(),
            Some("feeds")
        );
        assert_eq!(
            db.get_preference("theme.choice").await.unwrap().as_deref(),
            Some("dark")
        );
    }
}
