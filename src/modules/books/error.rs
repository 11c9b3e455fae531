use bookshelf_http::error::AppError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Book not found with ID: {0}")]
    NotFound(i32),

    #[error("{field} must be between {min} and {max} characters")]
    Validation {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("Failed to {action} book")]
    Persistence {
        action: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound(_) => AppError::not_found(err.to_string()),
            BookError::Validation { field, .. } => {
                let message = err.to_string();
                AppError::validation(
                    vec![json!({ "field": field, "error": message.clone() })],
                    message,
                )
            }
            BookError::Persistence { .. } => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_embeds_id() {
        let app: AppError = BookError::NotFound(42).into();
        assert_eq!(app.code(), "not_found");
        assert_eq!(app.public_message(), "Book not found with ID: 42");
    }

    #[test]
    fn validation_carries_field_details() {
        let app: AppError = BookError::Validation {
            field: "name",
            min: 1,
            max: 255,
        }
        .into();
        assert_eq!(app.code(), "validation_error");
        assert_eq!(app.details()[0]["field"], "name");
    }

    #[test]
    fn persistence_becomes_internal() {
        let app: AppError = BookError::Persistence {
            action: "create",
            source: sqlx::Error::PoolClosed,
        }
        .into();
        assert!(matches!(app, AppError::Internal(_)));
        assert_eq!(app.code(), "internal_error");
    }
}
