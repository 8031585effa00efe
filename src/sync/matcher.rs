//! Key matching between source and destination collections

use std::collections::HashMap;

use log::warn;

use super::mapped::MappedEntity;
use crate::error::{Result, SyncError};

/// Reference key to destination id, for keys present in both collections
pub type MatchTable = HashMap<String, String>;

/// How to treat a key that appears more than once in one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    /// Abort the resource
    #[default]
    Fail,
    /// Log and continue; the last destination entry with the key wins
    Warn,
}

/// Build the match table.
///
/// Keys are counted across both collections; any key seen more than once is
/// a match, and each destination entity carrying a matched key records its
/// id. A key repeated within the destination alone therefore also appears,
/// with the last entry winning. Run [`check_unique_keys`] first to reject
/// such collections.
pub fn find_matches(source: &[MappedEntity], destination: &[MappedEntity]) -> MatchTable {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entity in source.iter().chain(destination) {
        *counts.entry(entity.key.as_str()).or_default() += 1;
    }

    let mut table = MatchTable::new();
    for entity in destination {
        if counts.get(entity.key.as_str()).copied().unwrap_or(0) > 1 {
            table.insert(entity.key.clone(), entity.id.clone());
        }
    }
    table
}

/// Keys that occur more than once, in first-seen order.
pub fn duplicate_keys(entities: &[MappedEntity]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for entity in entities {
        let count = counts.entry(entity.key.as_str()).or_default();
        *count += 1;
        if *count == 2 {
            duplicates.push(entity.key.clone());
        }
    }
    duplicates
}

/// Verify keys are unique within one tenant's collection.
///
/// Returns the duplicated keys when the policy allows them.
pub fn check_unique_keys(
    resource: &str,
    side: &str,
    entities: &[MappedEntity],
    policy: DuplicateKeys,
) -> Result<Vec<String>> {
    let duplicates = duplicate_keys(entities);
    match (duplicates.first(), policy) {
        (Some(key), DuplicateKeys::Fail) => Err(SyncError::DuplicateKey {
            resource: resource.to_string(),
            side: side.to_string(),
            key: key.clone(),
        }
        .into()),
        (Some(_), DuplicateKeys::Warn) => {
            for key in &duplicates {
                warn!(
                    "Duplicate key '{}' in {} {}; the last entry wins",
                    key, side, resource
                );
            }
            Ok(duplicates)
        }
        (None, _) => Ok(duplicates),
    }
}

/// Index entities by key (last entry wins).
pub fn index_by_key(entities: &[MappedEntity]) -> HashMap<&str, &MappedEntity> {
    entities.iter().map(|e| (e.key.as_str(), e)).collect()
}

/// Map source ids to destination ids through a shared key.
///
/// Used to carry foreign references (type, group, category) across tenants.
pub fn translate_ids(source: &[MappedEntity], destination: &[MappedEntity]) -> HashMap<String, String> {
    let matches = find_matches(source, destination);
    source
        .iter()
        .filter_map(|e| matches.get(&e.key).map(|dest| (e.id.clone(), dest.clone())))
        .collect()
}
