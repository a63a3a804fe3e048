//! Entity identifiers
//!
//! Every persisted entity carries a 26-character, lexicographically
//! sortable identifier assigned at creation (spec §3). ULIDs satisfy
//! that shape directly and sort by creation time, which is convenient
//! for the digest queue's `ORDER BY queued_at` access pattern.

use ulid::Ulid;

/// Generate a new 26-character sortable identifier.
pub fn new_id() -> String {
    Ulid::new().to_string()
}
