//! Patch the cached book list from server-confirmed mutation results.
//!
//! Each function takes the cache and hands it back. Nothing here runs before
//! the server answers, and applying the same outcome twice changes nothing.
//! When the list has never been fetched there is nothing to patch; the next
//! read fetches it fresh.

use crate::book::Book;
use crate::cache::QueryCache;

/// A mutation outcome the server has confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmed {
    Created(Book),
    Updated(Book),
    Removed(Book),
}

pub fn reconcile(cache: QueryCache, outcome: &Confirmed) -> QueryCache {
    match outcome {
        Confirmed::Created(book) => apply_created(cache, book),
        Confirmed::Updated(book) => apply_updated(cache, book),
        Confirmed::Removed(book) => apply_removed(cache, book),
    }
}

/// Append the new book, or replace it in place if its id is already listed
pub fn apply_created(mut cache: QueryCache, created: &Book) -> QueryCache {
    let Some(mut books) = cache.books() else {
        return cache;
    };
    match books.iter_mut().find(|book| book.id == created.id) {
        Some(existing) => *existing = created.clone(),
        None => books.push(created.clone()),
    }
    cache.write_books(&books);
    cache
}

/// Replace the entry with the same id, keeping its position
pub fn apply_updated(mut cache: QueryCache, updated: &Book) -> QueryCache {
    let Some(mut books) = cache.books() else {
        return cache;
    };
    let Some(existing) = books.iter_mut().find(|book| book.id == updated.id) else {
        tracing::debug!(book_id = updated.id, "updated book not cached");
        return cache;
    };
    *existing = updated.clone();
    cache.write_books(&books);
    cache
}

pub fn apply_removed(mut cache: QueryCache, removed: &Book) -> QueryCache {
    let Some(mut books) = cache.books() else {
        return cache;
    };
    let before = books.len();
    books.retain(|book| book.id != removed.id);
    if books.len() != before {
        cache.write_books(&books);
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i32, name: &str) -> Book {
        Book {
            id,
            name: name.to_string(),
            description: "Filler".to_string(),
        }
    }

    fn cached(books: &[Book]) -> QueryCache {
        let mut cache = QueryCache::new();
        cache.write_books(books);
        cache
    }

    #[test]
    fn created_book_is_appended_once() {
        let outcome = Confirmed::Created(book(3, "Dune"));
        let once = reconcile(cached(&[book(1, "A"), book(2, "B")]), &outcome);
        let twice = reconcile(once.clone(), &outcome);

        assert_eq!(
            once.books().unwrap(),
            vec![book(1, "A"), book(2, "B"), book(3, "Dune")]
        );
        assert_eq!(twice, once);
    }

    #[test]
    fn updated_book_keeps_its_position() {
        let outcome = Confirmed::Updated(book(1, "A (revised)"));
        let once = reconcile(cached(&[book(1, "A"), book(2, "B")]), &outcome);

        assert_eq!(
            once.books().unwrap(),
            vec![book(1, "A (revised)"), book(2, "B")]
        );
        assert_eq!(reconcile(once.clone(), &outcome), once);
    }

    #[test]
    fn update_of_uncached_book_is_ignored() {
        let cache = cached(&[book(1, "A")]);
        let after = apply_updated(cache.clone(), &book(9, "Ghost"));
        assert_eq!(after, cache);
    }

    #[test]
    fn removed_book_is_dropped() {
        let outcome = Confirmed::Removed(book(1, "A"));
        let once = reconcile(cached(&[book(1, "A"), book(2, "B")]), &outcome);

        assert_eq!(once.books().unwrap(), vec![book(2, "B")]);
        assert_eq!(reconcile(once.clone(), &outcome), once);
    }

    #[test]
    fn unfetched_list_is_left_alone() {
        for outcome in [
            Confirmed::Created(book(1, "A")),
            Confirmed::Updated(book(1, "A")),
            Confirmed::Removed(book(1, "A")),
        ] {
            assert_eq!(reconcile(QueryCache::new(), &outcome), QueryCache::new());
        }
    }
}
