//! Seed-file loading. The collection is created exactly once from a static
//! JSON file and only ever mutated in place afterwards.
use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result};
use tracing::warn;

use crate::guests::GuestCollection;

/// Load the initial guest list from the seed file.
pub fn load_seed(path: impl AsRef<Path>) -> Result<GuestCollection> {
    let path = path.as_ref();

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Could not load {}", path.display()))?;
    let collection: GuestCollection = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid guest document", path.display()))?;

    check_seed(&collection);

    Ok(collection)
}

/// id/token uniqueness is an invariant of the data, not enforced by the
/// store. Violations in the seed are logged and loaded anyway.
fn check_seed(collection: &GuestCollection) {
    let mut ids = HashSet::new();
    let mut tokens = HashSet::new();

    for guest in &collection.guests {
        if !ids.insert(guest.id) {
            warn!("Duplicate guest id in seed: {}", guest.id);
        }
        if !tokens.insert(guest.token.as_str()) {
            warn!("Duplicate guest token in seed: {}", guest.token);
        }
    }

    let counted = collection.metadata.total_guests as usize;
    if counted != collection.guests.len() {
        warn!(
            "metadata.totalGuests is {counted} but the seed holds {} guests",
            collection.guests.len()
        );
    }
}
