//! Client side of the book catalog.
//!
//! A GraphQL transport ([`GraphqlClient`]), a keyed query cache patched from
//! confirmed mutation results ([`reconcile`]), and a [`BookCatalog`] that ties
//! both together behind per-operation in-flight guards.

pub mod api;
pub mod book;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod guard;
pub mod reconcile;

pub use api::{BookApi, GraphqlClient, StaticToken, TokenSource};
pub use book::{Book, BookDraft, CreateBookInput, UpdateBookInput};
pub use cache::{QueryCache, QueryKey, BOOKS_QUERY};
pub use catalog::{BookCatalog, Submission};
pub use error::ClientError;
pub use guard::{InFlight, InFlightGuard};
pub use reconcile::Confirmed;
