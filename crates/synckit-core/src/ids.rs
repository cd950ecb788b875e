//! Replica identifiers and logical timestamps.
//!
//! A [`ClientId`] is assigned once per replica at bootstrap and never
//! changes. A [`LogicalTimestamp`] pairs a per-client monotonic counter with
//! the `ClientId` that produced it; the pair totally orders every operation
//! in the system (lexicographic on `(counter, client_id)`), which is what
//! gives LWW merges a deterministic tie-break.
//!
//! # Examples
//!
//! ```
//! use synckit_core::{ClientId, LogicalTimestamp};
//!
//! let a = LogicalTimestamp::new(1, ClientId::from("a"));
//! let b = LogicalTimestamp::new(1, ClientId::from("b"));
//! assert!(a < b); // same counter, "b" wins lexicographically
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, locally unique identifier assigned per replica at bootstrap.
///
/// Immutable for the replica's lifetime. Used in clocks, LWW tie-breaking,
/// and awareness entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap a raw string as a `ClientId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random-looking `ClientId`.
    ///
    /// Host applications typically call this once at bootstrap and persist
    /// the result, since the `clientId` config option exists precisely to
    /// let a replica rejoin under the same identity later.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical timestamp: `(counter, client_id)`.
///
/// Total order: lexicographic on `(counter, client_id)`. Counters advance
/// monotonically per-client on every local mutation; they never advance for
/// an operation produced by a different client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTimestamp {
    pub counter: u64,
    pub client_id: ClientId,
}

impl LogicalTimestamp {
    pub fn new(counter: u64, client_id: ClientId) -> Self {
        Self { counter, client_id }
    }
}

impl PartialOrd for LogicalTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogicalTimestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.counter, &self.client_id).cmp(&(other.counter, &other.client_id))
    }
}

impl fmt::Display for LogicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.counter, self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_is_lexicographic_on_client_id() {
        let a = LogicalTimestamp::new(1, ClientId::from("a"));
        let b = LogicalTimestamp::new(1, ClientId::from("b"));
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn higher_counter_always_wins() {
        let a = LogicalTimestamp::new(2, ClientId::from("a"));
        let b = LogicalTimestamp::new(1, ClientId::from("z"));
        assert!(a > b);
    }

    #[test]
    fn generated_client_ids_differ() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
    }
}
