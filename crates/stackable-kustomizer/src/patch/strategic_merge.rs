//! Two-way strategic merge patch computation.
//!
//! The patch turns `original` into `modified` when applied with kustomize's strategic merge.
//! Keys removed from a map are set to `null`. Lists are replaced as a whole unless the
//! [`TypeRegistry`] knows a merge key for them, in which case only changed elements are emitted
//! together with the `$patch`, `$setElementOrder` and `$deleteFromPrimitiveList` directives.
use serde_json::{Map, Value, json};

use super::registry::{ListStrategy, TypeRegistry};

const PATCH_DIRECTIVE: &str = "$patch";
const SET_ELEMENT_ORDER_PREFIX: &str = "$setElementOrder/";
const DELETE_FROM_PRIMITIVE_LIST_PREFIX: &str = "$deleteFromPrimitiveList/";

/// Computes the patch between two JSON maps describing objects of `kind`.
pub fn create_two_way_merge_patch(
    registry: &TypeRegistry,
    kind: &str,
    original: &Map<String, Value>,
    modified: &Map<String, Value>,
) -> Map<String, Value> {
    let differ = Differ { registry, kind };
    let mut path = Vec::new();
    differ.diff_maps(original, modified, &mut path)
}

struct Differ<'a> {
    registry: &'a TypeRegistry,
    kind: &'a str,
}

impl<'a> Differ<'a> {
    fn diff_maps(
        &self,
        original: &'a Map<String, Value>,
        modified: &'a Map<String, Value>,
        path: &mut Vec<&'a str>,
    ) -> Map<String, Value> {
        let mut patch = Map::new();

        for (key, modified_value) in modified {
            let Some(original_value) = original.get(key) else {
                patch.insert(key.clone(), modified_value.clone());
                continue;
            };
            if original_value == modified_value {
                continue;
            }

            path.push(key);
            match (original_value, modified_value) {
                (Value::Object(original_map), Value::Object(modified_map)) => {
                    let nested = self.diff_maps(original_map, modified_map, path);
                    if !nested.is_empty() {
                        patch.insert(key.clone(), Value::Object(nested));
                    }
                }
                (Value::Array(original_list), Value::Array(modified_list)) => {
                    self.diff_lists(key, original_list, modified_list, path, &mut patch);
                }
                _ => {
                    patch.insert(key.clone(), modified_value.clone());
                }
            }
            path.pop();
        }

        for key in original.keys() {
            if !modified.contains_key(key) {
                patch.insert(key.clone(), Value::Null);
            }
        }

        patch
    }

    /// Adds the patch for the (unequal) list field `key` to `patch`.
    fn diff_lists(
        &self,
        key: &str,
        original: &'a [Value],
        modified: &'a [Value],
        path: &mut Vec<&'a str>,
        patch: &mut Map<String, Value>,
    ) {
        match self.registry.list_strategy(self.kind, path.as_slice()) {
            ListStrategy::MergeByKey(merge_key)
                if has_merge_keys(original, merge_key) && has_merge_keys(modified, merge_key) =>
            {
                self.diff_keyed_lists(key, merge_key, original, modified, path, patch);
            }
            ListStrategy::MergePrimitives
                if original.iter().chain(modified).all(is_primitive) =>
            {
                diff_primitive_lists(key, original, modified, patch);
            }
            _ => {
                patch.insert(key.to_owned(), Value::Array(modified.to_vec()));
            }
        }
    }

    fn diff_keyed_lists(
        &self,
        key: &str,
        merge_key: &str,
        original: &'a [Value],
        modified: &'a [Value],
        path: &mut Vec<&'a str>,
        patch: &mut Map<String, Value>,
    ) {
        let mut elements = Vec::new();

        for modified_element in modified {
            let (Value::Object(modified_map), Some(id)) =
                (modified_element, merge_key_of(modified_element, merge_key))
            else {
                continue;
            };

            match find_by_merge_key(original, merge_key, id) {
                Some(original_map) => {
                    let mut nested = self.diff_maps(original_map, modified_map, path);
                    if !nested.is_empty() {
                        nested.insert(merge_key.to_owned(), id.clone());
                        elements.push(Value::Object(nested));
                    }
                }
                None => elements.push(modified_element.clone()),
            }
        }

        for original_element in original {
            let Some(id) = merge_key_of(original_element, merge_key) else {
                continue;
            };
            if find_by_merge_key(modified, merge_key, id).is_none() {
                elements.push(json!({ PATCH_DIRECTIVE: "delete", merge_key: id }));
            }
        }

        let original_order: Vec<_> = original
            .iter()
            .filter_map(|element| merge_key_of(element, merge_key))
            .collect();
        let modified_order: Vec<_> = modified
            .iter()
            .filter_map(|element| merge_key_of(element, merge_key))
            .collect();

        if elements.is_empty() && original_order == modified_order {
            return;
        }

        if !elements.is_empty() {
            patch.insert(key.to_owned(), Value::Array(elements));
        }
        patch.insert(
            format!("{SET_ELEMENT_ORDER_PREFIX}{key}"),
            Value::Array(
                modified_order
                    .into_iter()
                    .map(|id| json!({ merge_key: id }))
                    .collect(),
            ),
        );
    }
}

fn diff_primitive_lists(
    key: &str,
    original: &[Value],
    modified: &[Value],
    patch: &mut Map<String, Value>,
) {
    let added: Vec<_> = modified
        .iter()
        .filter(|value| !original.contains(value))
        .cloned()
        .collect();
    let deleted: Vec<_> = original
        .iter()
        .filter(|value| !modified.contains(value))
        .cloned()
        .collect();

    if !added.is_empty() {
        patch.insert(key.to_owned(), Value::Array(added));
    }
    if !deleted.is_empty() {
        patch.insert(
            format!("{DELETE_FROM_PRIMITIVE_LIST_PREFIX}{key}"),
            Value::Array(deleted),
        );
    }
    patch.insert(
        format!("{SET_ELEMENT_ORDER_PREFIX}{key}"),
        Value::Array(modified.to_vec()),
    );
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn has_merge_keys(list: &[Value], merge_key: &str) -> bool {
    list.iter()
        .all(|element| merge_key_of(element, merge_key).is_some())
}

fn merge_key_of<'v>(element: &'v Value, merge_key: &str) -> Option<&'v Value> {
    element.as_object()?.get(merge_key)
}

fn find_by_merge_key<'v>(
    list: &'v [Value],
    merge_key: &str,
    id: &Value,
) -> Option<&'v Map<String, Value>> {
    list.iter()
        .filter_map(Value::as_object)
        .find(|element| element.get(merge_key) == Some(id))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn map(yaml: &str) -> Map<String, Value> {
        serde_yaml::from_str(yaml).expect("test YAML is valid")
    }

    fn diff(kind: &str, original: &str, modified: &str) -> Value {
        Value::Object(create_two_way_merge_patch(
            &TypeRegistry::default(),
            kind,
            &map(original),
            &map(modified),
        ))
    }

    #[test]
    fn identical_objects_produce_empty_patch() {
        let yaml = indoc! {"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: cfg
            data:
              x: '1'
        "};
        assert_eq!(diff("ConfigMap", yaml, yaml), json!({}));
    }

    #[test]
    fn changed_added_and_removed_keys() {
        let patch = diff(
            "ConfigMap",
            indoc! {"
                data:
                  x: '1'
                  y: '1'
                  gone: '1'
            "},
            indoc! {"
                data:
                  x: '2'
                  y: '1'
                  new: '1'
            "},
        );

        assert_eq!(
            patch,
            json!({ "data": { "x": "2", "new": "1", "gone": null } })
        );
    }

    #[test]
    fn unkeyed_lists_are_replaced() {
        let patch = diff(
            "Deployment",
            indoc! {"
                spec:
                  template:
                    spec:
                      containers:
                      - name: app
                        args: [a, b]
            "},
            indoc! {"
                spec:
                  template:
                    spec:
                      containers:
                      - name: app
                        args: [a, c]
            "},
        );

        assert_eq!(
            patch,
            json!({
                "spec": { "template": { "spec": {
                    "containers": [{ "name": "app", "args": ["a", "c"] }],
                    "$setElementOrder/containers": [{ "name": "app" }],
                }}}
            })
        );
    }

    #[test]
    fn keyed_lists_are_merged() {
        let patch = diff(
            "Deployment",
            indoc! {"
                spec:
                  template:
                    spec:
                      containers:
                      - name: app
                        image: app:1
                      - name: sidecar
                        image: sidecar:1
                      - name: removed
                        image: removed:1
            "},
            indoc! {"
                spec:
                  template:
                    spec:
                      containers:
                      - name: app
                        image: app:2
                      - name: sidecar
                        image: sidecar:1
                      - name: added
                        image: added:1
            "},
        );

        assert_eq!(
            patch,
            json!({
                "spec": { "template": { "spec": {
                    "containers": [
                        { "name": "app", "image": "app:2" },
                        { "name": "added", "image": "added:1" },
                        { "$patch": "delete", "name": "removed" },
                    ],
                    "$setElementOrder/containers": [
                        { "name": "app" },
                        { "name": "sidecar" },
                        { "name": "added" },
                    ],
                }}}
            })
        );
    }

    #[test]
    fn service_ports_are_merged_by_port() {
        let patch = diff(
            "Service",
            indoc! {"
                spec:
                  ports:
                  - port: 80
                    targetPort: 8080
            "},
            indoc! {"
                spec:
                  ports:
                  - port: 80
                    targetPort: 9090
            "},
        );

        assert_eq!(
            patch,
            json!({
                "spec": {
                    "ports": [{ "port": 80, "targetPort": 9090 }],
                    "$setElementOrder/ports": [{ "port": 80 }],
                }
            })
        );
    }

    #[test]
    fn primitive_lists_are_merged() {
        let patch = diff(
            "ConfigMap",
            indoc! {"
                metadata:
                  finalizers: [a, b]
            "},
            indoc! {"
                metadata:
                  finalizers: [b, c]
            "},
        );

        assert_eq!(
            patch,
            json!({
                "metadata": {
                    "finalizers": ["c"],
                    "$deleteFromPrimitiveList/finalizers": ["a"],
                    "$setElementOrder/finalizers": ["b", "c"],
                }
            })
        );
    }

    #[test]
    fn type_changes_replace_the_value() {
        let patch = diff("ConfigMap", "data: {x: '1'}\n", "data: null\n");
        assert_eq!(patch, json!({ "data": null }));
    }
}
