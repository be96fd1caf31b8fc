//! Selection and computation of the patch which expresses a target object relative to its base.
//!
//! Objects of official Kubernetes API groups are expressed as strategic merge patches, all other
//! objects (usually custom resources) as JSON 6902 patches. Added objects are emitted as a whole.
use kube::core::DynamicObject;
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    api_version::{GroupVersion, ParseGroupVersionError},
    diff::Change,
    identity::ResourceIdentity,
    kustomization::Selector,
};

pub mod json6902;
pub mod registry;
pub mod strategic_merge;

pub use registry::{ListStrategy, TypeRegistry};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse apiVersion {api_version:?}"))]
    ParseApiVersion {
        source: ParseGroupVersionError,
        api_version: String,
    },

    #[snafu(display("unknown type {kind:?} in {api_version:?}, no schema is registered"))]
    UnknownType { api_version: String, kind: String },

    #[snafu(display("failed to convert object into JSON"))]
    SerializeObject { source: serde_json::Error },

    #[snafu(display("object does not serialize into a JSON map"))]
    NotAnObject,
}

/// The file contents generated for a single target object.
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratedPatch {
    /// A partial object, always carrying `apiVersion`, `kind` and `metadata.name`.
    StrategicMerge(Map<String, Value>),

    /// A non-empty list of JSON 6902 operations and the object they apply to.
    Json6902 {
        patch: json_patch::Patch,
        target: Selector,
    },

    /// An object which does not exist in the base.
    Resource(Value),
}

/// Computes the patch for one classified object.
///
/// Returns [`None`] if the object is expressed by a JSON 6902 patch and that patch is empty, in
/// which case the object is dropped from the overlay.
pub fn generate(
    registry: &TypeRegistry,
    identity: &ResourceIdentity,
    change: &Change<'_>,
) -> Result<Option<GeneratedPatch>> {
    let (base, target) = match change {
        Change::Added { target } => {
            let target = serde_json::to_value(target).context(SerializeObjectSnafu)?;
            return Ok(Some(GeneratedPatch::Resource(target)));
        }
        Change::Modified { base, target } => (*base, *target),
    };

    let group_version = parse_group_version(identity)?;

    if group_version.is_official() {
        ensure!(
            registry.contains(&identity.api_version, &identity.kind),
            UnknownTypeSnafu {
                api_version: identity.api_version.clone(),
                kind: identity.kind.clone(),
            }
        );

        let mut patch = strategic_merge::create_two_way_merge_patch(
            registry,
            &identity.kind,
            &to_map(base)?,
            &to_map(target)?,
        );
        stamp_identity(&mut patch, base);

        Ok(Some(GeneratedPatch::StrategicMerge(patch)))
    } else {
        let base = serde_json::to_value(base).context(SerializeObjectSnafu)?;
        let target = serde_json::to_value(target).context(SerializeObjectSnafu)?;

        let patch = json6902::create_json_patch(&base, &target);
        if patch.0.is_empty() {
            return Ok(None);
        }

        Ok(Some(GeneratedPatch::Json6902 {
            patch,
            target: Selector {
                group: group_version.group,
                version: group_version.version,
                kind: identity.kind.clone(),
                namespace: identity.namespace.clone(),
                name: identity.name.clone(),
            },
        }))
    }
}

/// Returns whether `identity` belongs to an official API group and is therefore expressed as a
/// strategic merge patch.
pub fn is_official(identity: &ResourceIdentity) -> Result<bool> {
    parse_group_version(identity).map(|group_version| group_version.is_official())
}

fn parse_group_version(identity: &ResourceIdentity) -> Result<GroupVersion> {
    identity
        .api_version
        .parse()
        .with_context(|_| ParseApiVersionSnafu {
            api_version: identity.api_version.clone(),
        })
}

fn to_map(object: &DynamicObject) -> Result<Map<String, Value>> {
    match serde_json::to_value(object).context(SerializeObjectSnafu)? {
        Value::Object(map) => Ok(map),
        _ => NotAnObjectSnafu.fail(),
    }
}

/// Sets `apiVersion`, `kind` and `metadata.name` of `patch` to the values of `base`, so that the
/// patch identifies the object it applies to.
fn stamp_identity(patch: &mut Map<String, Value>, base: &DynamicObject) {
    let identity = ResourceIdentity::of(base);

    patch.insert("apiVersion".to_owned(), Value::String(identity.api_version));
    patch.insert("kind".to_owned(), Value::String(identity.kind));

    let metadata = patch
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(metadata) = metadata {
        metadata.insert("name".to_owned(), Value::String(identity.name));
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn object(yaml: &str) -> DynamicObject {
        serde_yaml::from_str(yaml).expect("test YAML is valid")
    }

    fn generate_modified(base: &str, target: &str) -> Result<Option<GeneratedPatch>> {
        let base = object(base);
        let target = object(target);
        generate(
            &TypeRegistry::default(),
            &ResourceIdentity::of(&target),
            &Change::Modified {
                base: &base,
                target: &target,
            },
        )
    }

    #[test]
    fn official_type_uses_strategic_merge() {
        let patch = generate_modified(
            indoc! {"
                apiVersion: v1
                kind: ConfigMap
                metadata:
                  name: cfg
                data:
                  x: '1'
            "},
            indoc! {"
                apiVersion: v1
                kind: ConfigMap
                metadata:
                  name: cfg
                data:
                  x: '2'
            "},
        )
        .expect("patch is generated");

        let Some(GeneratedPatch::StrategicMerge(patch)) = patch else {
            panic!("expected a strategic merge patch, got {patch:?}");
        };
        assert_eq!(
            Value::Object(patch),
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "cfg" },
                "data": { "x": "2" },
            })
        );
    }

    #[test]
    fn identical_official_object_only_carries_identity() {
        let yaml = indoc! {"
            apiVersion: apps/v1
            kind: Deployment
            metadata:
              name: web
              labels:
                app: web
            spec:
              replicas: 2
        "};

        let patch = generate_modified(yaml, yaml).expect("patch is generated");
        let Some(GeneratedPatch::StrategicMerge(patch)) = patch else {
            panic!("expected a strategic merge patch, got {patch:?}");
        };
        assert_eq!(
            Value::Object(patch),
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": "web" },
            })
        );
    }

    #[rstest]
    #[case("v1", "Event")]
    #[case("events.k8s.io/v1", "Event")]
    #[case("storage.k8s.io/v1", "CSIStorageCapacity")]
    #[case("admissionregistration.k8s.io/v1", "ValidatingAdmissionPolicy")]
    #[case("flowcontrol.apiserver.k8s.io/v1", "FlowSchema")]
    #[case("networking.k8s.io/v1", "ServiceCIDR")]
    fn built_in_kinds_use_strategic_merge(#[case] api_version: &str, #[case] kind: &str) {
        let yaml = format!("apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: x\n");

        let patch = generate_modified(&yaml, &yaml).expect("type is registered");
        assert_eq!(
            patch,
            Some(GeneratedPatch::StrategicMerge(
                json!({
                    "apiVersion": api_version,
                    "kind": kind,
                    "metadata": { "name": "x" },
                })
                .as_object()
                .cloned()
                .expect("literal is an object")
            ))
        );
    }

    #[test]
    fn custom_resource_uses_json_patch() {
        let patch = generate_modified(
            indoc! {"
                apiVersion: zookeeper.stackable.tech/v1alpha1
                kind: ZookeeperCluster
                metadata:
                  name: zk
                  namespace: data
                spec:
                  replicas: 1
            "},
            indoc! {"
                apiVersion: zookeeper.stackable.tech/v1alpha1
                kind: ZookeeperCluster
                metadata:
                  name: zk
                  namespace: data
                spec:
                  replicas: 3
            "},
        )
        .expect("patch is generated");

        let Some(GeneratedPatch::Json6902 { patch, target }) = patch else {
            panic!("expected a JSON 6902 patch, got {patch:?}");
        };
        assert_eq!(patch.0.len(), 1);
        assert_eq!(target, Selector {
            group: "zookeeper.stackable.tech".to_owned(),
            version: "v1alpha1".to_owned(),
            kind: "ZookeeperCluster".to_owned(),
            namespace: "data".to_owned(),
            name: "zk".to_owned(),
        });
    }

    #[test]
    fn identical_custom_resource_is_dropped() {
        let yaml = indoc! {"
            apiVersion: example.com/v1
            kind: Widget
            metadata:
              name: w
            spec:
              size: 3
        "};

        let patch = generate_modified(yaml, yaml).expect("patch is generated");
        assert_eq!(patch, None);
    }

    #[test]
    fn unknown_official_type_is_rejected() {
        let yaml = indoc! {"
            apiVersion: monitoring/v1
            kind: ServiceMonitor
            metadata:
              name: sm
        "};

        let err = generate_modified(yaml, yaml).expect_err("type is not registered");
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    #[test]
    fn malformed_api_version_is_an_error() {
        let yaml = indoc! {"
            apiVersion: a/b/v1
            kind: Widget
            metadata:
              name: w
        "};

        let err = generate_modified(yaml, yaml).expect_err("apiVersion is malformed");
        assert!(matches!(err, Error::ParseApiVersion { .. }));
    }

    #[test]
    fn added_object_is_emitted_as_is() {
        let target = object(indoc! {"
            apiVersion: v1
            kind: Secret
            metadata:
              name: tok
            stringData:
              token: abc
        "});

        let patch = generate(
            &TypeRegistry::default(),
            &ResourceIdentity::of(&target),
            &Change::Added { target: &target },
        )
        .expect("resource is generated");

        assert_eq!(
            patch,
            Some(GeneratedPatch::Resource(json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": { "name": "tok" },
                "stringData": { "token": "abc" },
            })))
        );
    }
}
