//! Project-specific utilities live here.

/// Formats a shared log prefix for project logs.
pub fn log_prefix(module: &str) -> String {
    format!("bookshelf::{module}")
}

/// Public path of a route mounted by a module under `/api/{module}`.
pub fn module_path(module: &str, path: &str) -> String {
    format!("/api/{module}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_paths_follow_mount_convention() {
        assert_eq!(module_path("books", "/graphql"), "/api/books/graphql");
        assert_eq!(log_prefix("books"), "bookshelf::books");
    }
}
