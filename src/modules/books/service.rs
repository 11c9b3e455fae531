use super::error::BookError;
use super::models::{Book, CreateBookInput, UpdateBookInput};
use super::repository::BookRepository;

/// CRUD operations on books. Every lookup miss is a [`BookError::NotFound`].
#[derive(Clone)]
pub struct BookService {
    repository: BookRepository,
}

impl BookService {
    pub fn new(repository: BookRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &BookRepository {
        &self.repository
    }

    pub async fn create(&self, input: CreateBookInput) -> Result<Book, BookError> {
        input.validate()?;
        let book = self
            .repository
            .insert(&input.name, &input.description)
            .await
            .map_err(|source| persistence("create", source))?;

        tracing::info!(book_id = book.id, "book created");
        Ok(book)
    }

    /// All books, ascending by id
    pub async fn find_all(&self) -> Result<Vec<Book>, BookError> {
        self.repository
            .find_all()
            .await
            .map_err(|source| persistence("list", source))
    }

    pub async fn find_one(&self, id: i32) -> Result<Book, BookError> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(|source| persistence("load", source))?
            .ok_or(BookError::NotFound(id))
    }

    pub async fn update(&self, input: UpdateBookInput) -> Result<Book, BookError> {
        input.validate()?;
        if input.is_empty() {
            return self.find_one(input.id).await;
        }

        let book = self
            .repository
            .update(input.id, input.name.as_deref(), input.description.as_deref())
            .await
            .map_err(|source| persistence("update", source))?
            .ok_or(BookError::NotFound(input.id))?;

        tracing::info!(book_id = book.id, "book updated");
        Ok(book)
    }

    /// Delete a book, returning its last stored state
    pub async fn remove(&self, id: i32) -> Result<Book, BookError> {
        let book = self
            .repository
            .delete(id)
            .await
            .map_err(|source| persistence("delete", source))?
            .ok_or(BookError::NotFound(id))?;

        tracing::info!(book_id = book.id, "book deleted");
        Ok(book)
    }
}

fn persistence(action: &'static str, source: sqlx::Error) -> BookError {
    tracing::error!(action, error = %source, "book store operation failed");
    BookError::Persistence { action, source }
}
