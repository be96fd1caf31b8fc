//! The kustomize configuration manifest (`kustomization.yaml`) as far as overlay generation needs
//! it.
//!
//! Only the fields which are read from source directories or written into generated overlays are
//! modelled. Unknown fields are ignored while reading, which keeps source manifests which use
//! additional kustomize features loadable.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const KUSTOMIZATION_KIND: &str = "Kustomization";

/// The file name used for every written manifest.
pub const KUSTOMIZATION_FILE_NAME: &str = "kustomization.yaml";

/// File names recognized as manifest while loading, in order of precedence.
pub const RECOGNIZED_FILE_NAMES: &[&str] =
    &[KUSTOMIZATION_FILE_NAME, "kustomization.yml", "Kustomization"];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("no kustomization found in {dir}", dir = dir.display()))]
    MissingManifest { dir: PathBuf },

    #[snafu(display("failed to read kustomization {path}", path = path.display()))]
    ReadManifest {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse kustomization {path}", path = path.display()))]
    ParseManifest {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display(
        "{path} has more than one bases ({count}), only a single base is supported",
        path = path.display()
    ))]
    TooManyBases { path: PathBuf, count: usize },
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_strategic_merge: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_json6902: Vec<JsonPatchReference>,
}

/// A reference to a JSON 6902 patch file, bound to the object it applies to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct JsonPatchReference {
    pub target: Selector,
    pub path: String,
}

/// Selects a single object by group, version, kind, namespace and name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Kustomization {
    /// Creates an empty manifest with `apiVersion` and `kind` set.
    pub fn new() -> Self {
        Self {
            api_version: Some(KUSTOMIZATION_API_VERSION.to_owned()),
            kind: Some(KUSTOMIZATION_KIND.to_owned()),
            ..Default::default()
        }
    }

    /// Returns the path of the manifest inside `dir`, trying all [`RECOGNIZED_FILE_NAMES`].
    pub fn locate(dir: &Path) -> Result<PathBuf> {
        RECOGNIZED_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .context(MissingManifestSnafu { dir })
    }

    /// Loads the manifest of the configuration directory `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::locate(dir)?;
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(ReadManifestSnafu { path })?;
        serde_yaml::from_str(&contents).context(ParseManifestSnafu { path })
    }

    /// Returns the single base of this manifest, if any.
    ///
    /// `path` is only used for error reporting. Manifests with more than one base are rejected.
    pub fn single_base(&self, path: &Path) -> Result<Option<&str>> {
        ensure!(self.bases.len() <= 1, TooManyBasesSnafu {
            path,
            count: self.bases.len()
        });

        Ok(self.bases.first().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_source_manifest() {
        let kustomization: Kustomization = serde_yaml::from_str(indoc! {"
            apiVersion: kustomize.config.k8s.io/v1beta1
            kind: Kustomization
            namespace: ignored
            bases:
            - ../base
            resources:
            - deployment.yaml
            - service.yaml
        "})
        .expect("test YAML is valid");

        assert_eq!(kustomization.bases, vec!["../base"]);
        assert_eq!(kustomization.resources, vec!["deployment.yaml", "service.yaml"]);
        assert!(kustomization.patches_strategic_merge.is_empty());
    }

    #[test]
    fn serialize_omits_empty_fields() {
        let mut kustomization = Kustomization::new();
        kustomization.patches_json6902.push(JsonPatchReference {
            target: Selector {
                group: String::new(),
                version: "v1".to_owned(),
                kind: "ConfigMap".to_owned(),
                namespace: String::new(),
                name: "cfg".to_owned(),
            },
            path: "patch.yaml".to_owned(),
        });

        let yaml = serde_yaml::to_string(&kustomization).expect("manifest must serialize");
        assert_eq!(yaml, indoc! {"
            apiVersion: kustomize.config.k8s.io/v1beta1
            kind: Kustomization
            patchesJson6902:
            - target:
                version: v1
                kind: ConfigMap
                name: cfg
              path: patch.yaml
        "});
    }

    #[rstest]
    #[case(vec![], None)]
    #[case(vec!["../base"], Some("../base"))]
    fn single_base(#[case] bases: Vec<&str>, #[case] expected: Option<&str>) {
        let kustomization = Kustomization {
            bases: bases.into_iter().map(ToOwned::to_owned).collect(),
            ..Default::default()
        };

        let base = kustomization
            .single_base(Path::new("kustomization.yaml"))
            .expect("at most one base");
        assert_eq!(base, expected);
    }

    #[test]
    fn too_many_bases() {
        let kustomization = Kustomization {
            bases: vec!["../a".to_owned(), "../b".to_owned()],
            ..Default::default()
        };

        let err = kustomization
            .single_base(Path::new("variant/kustomization.yaml"))
            .expect_err("two bases are rejected");
        assert!(matches!(err, Error::TooManyBases { count: 2, .. }));
        assert!(err.to_string().contains("variant/kustomization.yaml"));
    }

    #[test]
    fn locate_alternative_file_name() {
        let temp_dir = tempdir().expect("create temporary directory");
        std::fs::write(temp_dir.path().join("kustomization.yml"), "resources: []\n")
            .expect("write manifest");

        let path = Kustomization::locate(temp_dir.path()).expect("manifest is found");
        assert_eq!(path, temp_dir.path().join("kustomization.yml"));
    }

    #[test]
    fn load_missing_manifest() {
        let temp_dir = tempdir().expect("create temporary directory");

        let err = Kustomization::load(temp_dir.path()).expect_err("no manifest present");
        assert!(matches!(err, Error::MissingManifest { .. }));
    }
}
