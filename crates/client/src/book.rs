use serde::{Deserialize, Serialize};

/// A book as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateBookInput {
    pub name: String,
    pub description: String,
}

/// Partial update; absent fields are left out of the request entirely
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UpdateBookInput {
    pub id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Form contents for a create or an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub name: String,
    pub description: String,
}

impl BookDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn into_create(self) -> CreateBookInput {
        CreateBookInput {
            name: self.name,
            description: self.description,
        }
    }

    /// Edits send every field, not a diff
    pub fn into_update(self, id: i32) -> UpdateBookInput {
        UpdateBookInput {
            id,
            name: Some(self.name),
            description: Some(self.description),
        }
    }
}
