use std::fmt::Display;

use kube::core::DynamicObject;

/// Identifies an object across the resource sets of different variants.
///
/// Two objects with the same identity in a base and in a target directory are treated as the same
/// logical resource. Missing fields are represented by empty strings, which means cluster-scoped
/// objects have an empty `namespace`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceIdentity {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ResourceIdentity {
    pub fn of(object: &DynamicObject) -> Self {
        let (api_version, kind) = object
            .types
            .as_ref()
            .map(|types| (types.api_version.clone(), types.kind.clone()))
            .unwrap_or_default();

        Self {
            api_version,
            kind,
            name: object.metadata.name.clone().unwrap_or_default(),
            namespace: object.metadata.namespace.clone().unwrap_or_default(),
        }
    }
}

impl Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)?;
        if !self.namespace.is_empty() {
            write!(f, " {}/{}", self.namespace, self.name)
        } else {
            write!(f, " {}", self.name)
        }
    }
}
