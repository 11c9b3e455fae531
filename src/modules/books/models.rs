use async_graphql::{InputObject, SimpleObject};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::error::BookError;

pub const NAME_MIN_CHARS: usize = 1;
pub const NAME_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MIN_CHARS: usize = 1;
pub const DESCRIPTION_MAX_CHARS: usize = 5000;

/// A catalog entry. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject, FromRow)]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Fields required to create a book
#[derive(Debug, Clone, Serialize, Deserialize, InputObject)]
pub struct CreateBookInput {
    pub name: String,
    pub description: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct UpdateBookInput {
    pub id: i32,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateBookInput {
    pub fn validate(&self) -> Result<(), BookError> {
        check_length("name", &self.name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        check_length(
            "description",
            &self.description,
            DESCRIPTION_MIN_CHARS,
            DESCRIPTION_MAX_CHARS,
        )
    }
}

impl UpdateBookInput {
    pub fn validate(&self) -> Result<(), BookError> {
        if let Some(name) = &self.name {
            check_length("name", name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        }
        if let Some(description) = &self.description {
            check_length(
                "description",
                description,
                DESCRIPTION_MIN_CHARS,
                DESCRIPTION_MAX_CHARS,
            )?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

fn check_length(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), BookError> {
    let chars = value.chars().count();
    if (min..=max).contains(&chars) {
        Ok(())
    } else {
        Err(BookError::Validation { field, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, description: &str) -> CreateBookInput {
        CreateBookInput {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn accepts_bounds() {
        assert!(create("D", "S").validate().is_ok());
        assert!(create(&"n".repeat(NAME_MAX_CHARS), &"d".repeat(DESCRIPTION_MAX_CHARS))
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized_fields() {
        assert!(matches!(
            create("", "Sci-fi novel").validate(),
            Err(BookError::Validation { field: "name", .. })
        ));
        assert!(matches!(
            create("Dune", &"d".repeat(DESCRIPTION_MAX_CHARS + 1)).validate(),
            Err(BookError::Validation { field: "description", .. })
        ));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 255 multi-byte characters are still a valid name.
        assert!(create(&"é".repeat(NAME_MAX_CHARS), "Roman").validate().is_ok());
    }

    #[test]
    fn update_validates_only_present_fields() {
        let empty = UpdateBookInput {
            id: 1,
            ..UpdateBookInput::default()
        };
        assert!(empty.is_empty());
        assert!(empty.validate().is_ok());

        let blank_name = UpdateBookInput {
            id: 1,
            name: Some(String::new()),
            description: None,
        };
        assert!(!blank_name.is_empty());
        assert!(matches!(
            blank_name.validate(),
            Err(BookError::Validation { field: "name", .. })
        ));
    }
}
