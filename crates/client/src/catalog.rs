use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::BookApi;
use crate::book::{Book, BookDraft};
use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::guard::InFlightGuard;
use crate::reconcile::{self, Confirmed};

/// Result of a guarded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    Completed(T),
    /// Another call of the same kind was still in flight
    Dropped,
}

/// Book list view model: cache-first reads, server-confirmed writes.
///
/// Saves (create or update) and deletes each have their own in-flight guard,
/// so a double-submitted form produces one request and one cache patch.
pub struct BookCatalog<A> {
    api: A,
    cache: Mutex<QueryCache>,
    saving: InFlightGuard,
    deleting: InFlightGuard,
}

impl<A: BookApi> BookCatalog<A> {
    pub fn new(api: A) -> Self {
        Self::with_cache(api, QueryCache::new())
    }

    pub fn with_cache(api: A, cache: QueryCache) -> Self {
        Self {
            api,
            cache: Mutex::new(cache),
            saving: InFlightGuard::new(),
            deleting: InFlightGuard::new(),
        }
    }

    /// Cached list when present, otherwise fetched and cached
    pub async fn books(&self) -> Result<Vec<Book>, ClientError> {
        if let Some(books) = self.cached_books() {
            return Ok(books);
        }
        self.refresh().await
    }

    /// Fetch from the server and overwrite the cached list
    pub async fn refresh(&self) -> Result<Vec<Book>, ClientError> {
        let books = self.api.books().await?;
        self.lock_cache().write_books(&books);
        tracing::debug!(count = books.len(), "book list refreshed");
        Ok(books)
    }

    pub fn cached_books(&self) -> Option<Vec<Book>> {
        self.lock_cache().books()
    }

    pub fn snapshot(&self) -> QueryCache {
        self.lock_cache().clone()
    }

    /// Update `editing` when set, otherwise create
    pub async fn save(
        &self,
        editing: Option<i32>,
        draft: BookDraft,
    ) -> Result<Submission<Book>, ClientError> {
        let Some(_ticket) = self.saving.try_begin() else {
            tracing::debug!(?editing, "save already in flight; dropping");
            return Ok(Submission::Dropped);
        };

        let confirmed = match editing {
            Some(id) => Confirmed::Updated(self.api.update_book(draft.into_update(id)).await?),
            None => Confirmed::Created(self.api.create_book(draft.into_create()).await?),
        };
        Ok(Submission::Completed(self.apply(confirmed)))
    }

    pub async fn delete(&self, id: i32) -> Result<Submission<Book>, ClientError> {
        let Some(_ticket) = self.deleting.try_begin() else {
            tracing::debug!(book_id = id, "delete already in flight; dropping");
            return Ok(Submission::Dropped);
        };

        let removed = self.api.remove_book(id).await?;
        Ok(Submission::Completed(
            self.apply(Confirmed::Removed(removed)),
        ))
    }

    fn apply(&self, confirmed: Confirmed) -> Book {
        let mut cache = self.lock_cache();
        let current = std::mem::take(&mut *cache);
        *cache = reconcile::reconcile(current, &confirmed);

        match confirmed {
            Confirmed::Created(book) | Confirmed::Updated(book) | Confirmed::Removed(book) => book,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, QueryCache> {
        // The cache is always left whole, so a poisoned lock is still usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
