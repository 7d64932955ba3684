//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (parley-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod message;
pub mod persona;
pub mod session;
pub mod user;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

/// Parse an `ordering` query value (`name`, `-created_at`) against a set of
/// allowed fields. Returns `None` for fields outside the set.
pub fn parse_ordering<'a>(raw: &str, allowed: &[&'a str]) -> Option<(&'a str, SortOrder)> {
    let (field, order) = match raw.strip_prefix('-') {
        Some(rest) => (rest, SortOrder::Desc),
        None => (raw, SortOrder::Asc),
    };
    allowed
        .iter()
        .find(|f| **f == field)
        .map(|f| (*f, order))
}
