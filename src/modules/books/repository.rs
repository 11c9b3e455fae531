use sqlx::SqlitePool;

use super::models::Book;

/// Row-level access to the `book` table
#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, name: &str, description: &str) -> Result<Book, sqlx::Error> {
        sqlx::query_as::<_, Book>(
            "INSERT INTO book (name, description) VALUES (?, ?) RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_all(&self) -> Result<Vec<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>("SELECT id, name, description FROM book ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>("SELECT id, name, description FROM book WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Overwrite the provided fields in one statement. `None` when the id is absent.
    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(
            "UPDATE book
             SET name = COALESCE(?, name), description = COALESCE(?, description)
             WHERE id = ?
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete and return the row as it was. `None` when the id is absent.
    pub async fn delete(&self, id: i32) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>("DELETE FROM book WHERE id = ? RETURNING id, name, description")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await
    }
}
