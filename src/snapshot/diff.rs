//! Snapshot comparison engine.
//!
//! Works out which tabs are new since the previous pass:
//! - Matches items by url only
//! - A url seen before is never new again, even if its title or mode changed
//! - Tabs that disappeared are not reported (the log is append-only)

use super::{Item, Snapshot};

/// Items judged new in one pass, in the iteration order of the current
/// snapshot.
pub type PendingBatch = Vec<Item>;

/// Items in `current` whose url is not a key of `previous`.
///
/// A changed title or mode on a known url does not make it new again.
/// The log records first sightings, not edits.
pub fn diff(current: &Snapshot, previous: &Snapshot) -> PendingBatch {
    // first pass, everything is new
    if previous.is_empty() {
        return current.iter().cloned().collect();
    }

    current
        .iter()
        .filter(|item| !previous.contains_url(&item.url))
        .cloned()
        .collect()
}
