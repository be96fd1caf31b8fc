//! Loading the objects a configuration directory declares into an identity-addressable set.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kube::core::DynamicObject;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::identity::ResourceIdentity;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read resource file {path}", path = path.display()))]
    ReadResource {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to decode document {index} of {path}", path = path.display()))]
    DecodeDocument {
        source: serde_yaml::Error,
        path: PathBuf,
        index: usize,
    },

    #[snafu(display(
        "document {index} of {path} is not an object",
        path = path.display()
    ))]
    InvalidDocument { path: PathBuf, index: usize },

    #[snafu(display("failed to decode object in document {index} of {path}", path = path.display()))]
    DecodeObject {
        source: serde_json::Error,
        path: PathBuf,
        index: usize,
    },

    #[snafu(display(
        "failed to decode item {item} of list document {index} in {path}",
        path = path.display()
    ))]
    DecodeListItem {
        source: serde_json::Error,
        path: PathBuf,
        index: usize,
        item: usize,
    },
}

/// The decoded objects of one configuration directory, keyed by their identity.
///
/// Objects keep the order in which they were discovered. If an identity occurs more than once,
/// the last object wins but keeps the position of the first one.
#[derive(Clone, Debug, Default)]
pub struct ResourceSet {
    objects: IndexMap<ResourceIdentity, DynamicObject>,
}

impl ResourceSet {
    /// Decodes all `resources` relative to `dir`.
    ///
    /// Every file may contain multiple YAML (or JSON) documents. Documents with an `items` list
    /// are treated as lists and contribute each item instead of themselves. Empty documents are
    /// skipped.
    pub fn load<S: AsRef<str>>(dir: &Path, resources: &[S]) -> Result<Self> {
        let mut set = Self::default();

        for resource in resources {
            let path = dir.join(resource.as_ref());
            let contents = std::fs::read_to_string(&path).context(ReadResourceSnafu {
                path: path.clone(),
            })?;
            set.extend_from_str(&contents, &path)?;
        }

        debug!(dir = %dir.display(), objects = set.len(), "loaded resource set");
        Ok(set)
    }

    /// Decodes all documents in `contents`. `path` is only used for error reporting.
    pub fn extend_from_str(&mut self, contents: &str, path: &Path) -> Result<()> {
        for (index, document) in serde_yaml::Deserializer::from_str(contents).enumerate() {
            let value = serde_json::Value::deserialize(document)
                .with_context(|_| DecodeDocumentSnafu { path, index })?;

            match value {
                serde_json::Value::Null => {}
                serde_json::Value::Object(mut map) => match map.remove("items") {
                    Some(serde_json::Value::Array(items)) => {
                        for (item, value) in items.into_iter().enumerate() {
                            let object = serde_json::from_value(value).with_context(|_| {
                                DecodeListItemSnafu { path, index, item }
                            })?;
                            self.insert(object);
                        }
                    }
                    items => {
                        if let Some(items) = items {
                            map.insert("items".to_owned(), items);
                        }
                        let object = serde_json::from_value(serde_json::Value::Object(map))
                            .with_context(|_| DecodeObjectSnafu { path, index })?;
                        self.insert(object);
                    }
                },
                _ => return InvalidDocumentSnafu { path, index }.fail(),
            }
        }

        Ok(())
    }

    /// Inserts `object`, replacing any object with the same identity.
    pub fn insert(&mut self, object: DynamicObject) {
        let identity = ResourceIdentity::of(&object);
        if self.objects.insert(identity.clone(), object).is_some() {
            warn!(%identity, "duplicate object identity, the last definition wins");
        }
    }

    pub fn get(&self, identity: &ResourceIdentity) -> Option<&DynamicObject> {
        self.objects.get(identity)
    }

    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.objects.contains_key(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceIdentity, &DynamicObject)> {
        self.objects.iter()
    }

    pub fn identities(&self) -> impl Iterator<Item = &ResourceIdentity> {
        self.objects.keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}
