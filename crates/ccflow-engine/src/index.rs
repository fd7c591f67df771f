use std::collections::HashMap;

use crate::schema::RawRecord;

/// Adjacency view over a flat record set: id -> record lookup plus
/// parent -> ordered children.
///
/// Parent pointers come from the log and are untrusted; they may reference
/// records that were truncated away and nothing guarantees acyclicity. The
/// index only materializes the edges once, and every traversal over it
/// carries its own visited set.
pub struct RecordIndex<'a> {
    by_id: HashMap<&'a str, &'a RawRecord>,
    children: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> RecordIndex<'a> {
    pub fn build(records: &'a [RawRecord]) -> Self {
        let mut by_id: HashMap<&str, &RawRecord> = HashMap::new();
        for record in records {
            if let Some(id) = record.id() {
                // Last write wins on id collisions.
                by_id.insert(id, record);
            }
        }

        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for record in records {
            if let (Some(id), Some(parent)) = (record.id(), record.parent_id()) {
                children.entry(parent).or_default().push(id);
            }
        }
        // Siblings ordered by their own timestamp; records without one sort
        // first. The sort is stable, so input order breaks ties.
        for kids in children.values_mut() {
            kids.sort_by_key(|id| {
                by_id
                    .get(*id)
                    .map(|record| record.timestamp.as_str())
                    .unwrap_or("")
            });
        }

        Self { by_id, children }
    }

    pub fn get(&self, id: &str) -> Option<&'a RawRecord> {
        self.by_id.get(id).copied()
    }

    pub fn children(&self, id: &str) -> &[&'a str] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of records whose parent is absent or not resolvable in the set.
    /// Truncated logs and compaction boundaries land here by design.
    pub fn roots(&self, records: &'a [RawRecord]) -> Vec<&'a str> {
        records
            .iter()
            .filter_map(|record| {
                let id = record.id()?;
                match record.parent_id() {
                    Some(parent) if self.by_id.contains_key(parent) => None,
                    _ => Some(id),
                }
            })
            .collect()
    }
}
