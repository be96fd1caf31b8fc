//! Collision-free file names for the files generated into one overlay.
//!
//! Names are resolved for a whole overlay at once. A probing pass computes the candidate name of
//! every entry for all [`Granularity`] levels and records which levels produce collisions. The
//! narrowest collision-free level is then used for every file of the overlay, so the naming
//! scheme of an overlay is always uniform.
use std::collections::BTreeSet;

use crate::kustomization::KUSTOMIZATION_FILE_NAME;

const STRATEGIC_MERGE_SUFFIX: &str = "overlay";
const JSON_PATCH_SUFFIX: &str = "patch";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    /// One fixed name per patch category, added resources use their object name.
    Short,

    /// Patch names are qualified with the object name.
    Medium,

    /// All names are qualified with the object name and the lower-cased kind.
    Long,
}

impl Granularity {
    pub const ALL: [Self; 3] = [Self::Short, Self::Medium, Self::Long];
}

/// The kind of file an entry is generated into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    StrategicMerge,
    JsonPatch,
    Resource,
}

/// A file to be named, described by its category and the object it is generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamingEntry<'a> {
    pub category: Category,
    pub name: &'a str,
    pub kind: &'a str,
}

impl NamingEntry<'_> {
    /// Returns the file name of this entry at the given granularity.
    pub fn file_name(&self, granularity: Granularity) -> String {
        let kind = self.kind.to_lowercase();
        let name = self.name;

        match (self.category, granularity) {
            (Category::StrategicMerge, Granularity::Short) => {
                format!("{STRATEGIC_MERGE_SUFFIX}.yaml")
            }
            (Category::StrategicMerge, Granularity::Medium) => {
                format!("{name}-{STRATEGIC_MERGE_SUFFIX}.yaml")
            }
            (Category::StrategicMerge, Granularity::Long) => {
                format!("{name}-{kind}-{STRATEGIC_MERGE_SUFFIX}.yaml")
            }
            (Category::JsonPatch, Granularity::Short) => format!("{JSON_PATCH_SUFFIX}.yaml"),
            (Category::JsonPatch, Granularity::Medium) => {
                format!("{name}-{JSON_PATCH_SUFFIX}.yaml")
            }
            (Category::JsonPatch, Granularity::Long) => {
                format!("{name}-{kind}-{JSON_PATCH_SUFFIX}.yaml")
            }
            (Category::Resource, Granularity::Short | Granularity::Medium) => {
                format!("{name}.yaml")
            }
            (Category::Resource, Granularity::Long) => format!("{name}-{kind}.yaml"),
        }
    }
}

/// Tracks the names taken at every granularity while probing the entries of one overlay.
///
/// Every overlay uses its own context, nothing is shared between overlays.
#[derive(Debug)]
pub struct NamingContext {
    taken: [BTreeSet<String>; 3],
    conflicts: [bool; 3],
}

impl Default for NamingContext {
    fn default() -> Self {
        let reserved = BTreeSet::from([KUSTOMIZATION_FILE_NAME.to_owned()]);

        Self {
            taken: [reserved.clone(), reserved.clone(), reserved],
            conflicts: [false; 3],
        }
    }
}

impl NamingContext {
    pub fn probe(&mut self, entry: &NamingEntry<'_>) {
        for (index, granularity) in Granularity::ALL.into_iter().enumerate() {
            if !self.taken[index].insert(entry.file_name(granularity)) {
                self.conflicts[index] = true;
            }
        }
    }

    /// Returns the narrowest granularity without collisions, if there is one.
    pub fn granularity(&self) -> Option<Granularity> {
        Granularity::ALL
            .into_iter()
            .zip(self.conflicts)
            .find_map(|(granularity, conflict)| (!conflict).then_some(granularity))
    }
}

/// Probes all `entries` and returns the granularity to name them with.
pub fn resolve(entries: &[NamingEntry<'_>]) -> Option<Granularity> {
    let mut context = NamingContext::default();
    for entry in entries {
        context.probe(entry);
    }
    context.granularity()
}
