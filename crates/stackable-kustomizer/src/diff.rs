//! Classification of the objects of a target directory relative to its base.
use kube::core::DynamicObject;

use crate::{identity::ResourceIdentity, resource_set::ResourceSet};

/// How a target object relates to the base it is expressed against.
#[derive(Clone, Copy, Debug)]
pub enum Change<'a> {
    /// The base contains an object with the same identity. This is also the case if both objects
    /// are identical, patch generation takes care of dropping empty patches.
    Modified {
        base: &'a DynamicObject,
        target: &'a DynamicObject,
    },

    /// The object only exists in the target.
    Added { target: &'a DynamicObject },
}

impl<'a> Change<'a> {
    pub fn target(&self) -> &'a DynamicObject {
        match self {
            Self::Modified { target, .. } | Self::Added { target } => target,
        }
    }
}

/// A classified target object.
#[derive(Clone, Debug)]
pub struct Classified<'a> {
    pub identity: &'a ResourceIdentity,
    pub change: Change<'a>,
}

/// Classifies every object of `target` against `base`, in the discovery order of `target`.
///
/// Objects which only exist in `base` are not part of the result, overlays can not express
/// deletions.
pub fn classify<'a>(target: &'a ResourceSet, base: &'a ResourceSet) -> Vec<Classified<'a>> {
    target
        .iter()
        .map(|(identity, target)| {
            let change = match base.get(identity) {
                Some(base) => Change::Modified { base, target },
                None => Change::Added { target },
            };
            Classified { identity, change }
        })
        .collect()
}

/// Returns the identities which exist in `base` but not in `target`.
pub fn removed<'a>(
    target: &'a ResourceSet,
    base: &'a ResourceSet,
) -> impl Iterator<Item = &'a ResourceIdentity> {
    base.identities()
        .filter(move |identity| !target.contains(identity))
}
