use std::collections::HashMap;

use serde_json::Value;

use crate::book::Book;

/// Identity of a cached query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey(&'static str);

impl QueryKey {
    pub const fn new(operation: &'static str) -> Self {
        Self(operation)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// The "all books" query
pub const BOOKS_QUERY: QueryKey = QueryKey::new("GetBooks");

/// Normalized read model keyed by query identity.
///
/// Entries are stored as JSON so any query result fits; the book list has
/// typed accessors on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCache {
    entries: HashMap<QueryKey, Value>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, key: QueryKey) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn write(&mut self, key: QueryKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn evict(&mut self, key: QueryKey) -> Option<Value> {
        self.entries.remove(&key)
    }

    /// The cached book list; `None` when never fetched or not decodable
    pub fn books(&self) -> Option<Vec<Book>> {
        let value = self.read(BOOKS_QUERY)?;
        match serde_json::from_value(value.clone()) {
            Ok(books) => Some(books),
            Err(err) => {
                tracing::warn!(error = %err, "discarding undecodable books cache entry");
                None
            }
        }
    }

    pub fn write_books(&mut self, books: &[Book]) {
        match serde_json::to_value(books) {
            Ok(value) => self.write(BOOKS_QUERY, value),
            Err(err) => tracing::warn!(error = %err, "could not cache books"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book {
            id: 1,
            name: "Dune".to_string(),
            description: "Sci-fi novel".to_string(),
        }
    }

    #[test]
    fn books_round_trip_through_cache() {
        let mut cache = QueryCache::new();
        assert!(cache.books().is_none());

        cache.write_books(&[dune()]);
        assert_eq!(cache.books(), Some(vec![dune()]));

        cache.evict(BOOKS_QUERY);
        assert!(cache.read(BOOKS_QUERY).is_none());
    }

    #[test]
    fn undecodable_entry_reads_as_absent() {
        let mut cache = QueryCache::new();
        cache.write(BOOKS_QUERY, serde_json::json!({ "unexpected": true }));
        assert!(cache.books().is_none());
    }
}
