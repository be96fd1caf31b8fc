//! The top-level generation input: named profiles, each an ordered list of variables.
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use snafu::{ResultExt, Snafu};

/// The file name of the profile configuration within the input root.
pub const CONFIG_FILE_NAME: &str = "kustomizer.yaml";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read profile configuration {path}", path = path.display()))]
    ReadConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse profile configuration {path}", path = path.display()))]
    ParseConfig {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("a variable must set exactly one of `base` or `dir`"))]
    InvalidVariable,
}

/// The parsed contents of [`CONFIG_FILE_NAME`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct KustomizerConfig {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl KustomizerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        serde_yaml::from_str(&contents).context(ParseConfigSnafu { path })
    }
}

/// An ordered list of variables. The order defines the nesting of the generated overlay tree.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Profile(pub Vec<Variable>);

impl Profile {
    pub fn variables(&self) -> &[Variable] {
        &self.0
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawVariable")]
pub struct Variable {
    pub source: VariableSource,

    /// Also continue the preceding variable's overlay with the variable after this one, skipping
    /// this one.
    pub fork: bool,
}

impl Variable {
    pub fn base(path: impl Into<PathBuf>) -> Self {
        Self {
            source: VariableSource::Base(path.into()),
            fork: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            source: VariableSource::Dir(path.into()),
            fork: false,
        }
    }

    #[must_use]
    pub fn forked(mut self) -> Self {
        self.fork = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableSource {
    /// A single source directory, relative to the input root.
    Base(PathBuf),

    /// A directory, relative to the input root, whose immediate subdirectories each become a
    /// separate branch.
    Dir(PathBuf),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVariable {
    #[serde(default)]
    base: Option<PathBuf>,

    #[serde(default)]
    dir: Option<PathBuf>,

    #[serde(default)]
    fork: bool,
}

impl TryFrom<RawVariable> for Variable {
    type Error = Error;

    fn try_from(raw: RawVariable) -> Result<Self> {
        let non_empty = |path: Option<PathBuf>| path.filter(|path| !path.as_os_str().is_empty());

        let source = match (non_empty(raw.base), non_empty(raw.dir)) {
            (Some(base), None) => VariableSource::Base(base),
            (None, Some(dir)) => VariableSource::Dir(dir),
            _ => return InvalidVariableSnafu.fail(),
        };

        Ok(Self {
            source,
            fork: raw.fork,
        })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[test]
    fn parse_config() {
        let config: KustomizerConfig = serde_yaml::from_str(indoc! {"
            profiles:
              zookeeper:
                - base: zookeeper/base
                - dir: zookeeper/cloud
                - base: zookeeper/tls
                  fork: true
                - base: zookeeper/monitoring
              kafka:
                - base: kafka
        "})
        .expect("config is valid");

        assert_eq!(
            config.profiles.keys().collect::<Vec<_>>(),
            ["kafka", "zookeeper"]
        );
        assert_eq!(config.profiles["zookeeper"], Profile(vec![
            Variable::base("zookeeper/base"),
            Variable::dir("zookeeper/cloud"),
            Variable::base("zookeeper/tls").forked(),
            Variable::base("zookeeper/monitoring"),
        ]));
    }

    #[rstest]
    #[case::both("- base: a\n  dir: b\n")]
    #[case::neither("- fork: true\n")]
    #[case::empty("- base: ''\n")]
    fn invalid_variable(#[case] yaml: &str) {
        let err = serde_yaml::from_str::<Profile>(yaml).expect_err("variable is invalid");
        assert!(
            err.to_string().contains("exactly one of `base` or `dir`"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn load_from_file() {
        let temp_dir = tempfile::tempdir().expect("create temporary directory");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "profiles:\n  app:\n    - base: app\n").expect("write config");

        let config = KustomizerConfig::load(&path).expect("config loads");
        assert_eq!(config.profiles["app"].variables(), [Variable::base("app")]);
    }

    #[test]
    fn missing_file() {
        let err = KustomizerConfig::load(Path::new("/nonexistent/kustomizer.yaml"))
            .expect_err("file does not exist");
        assert!(matches!(err, Error::ReadConfig { .. }));
    }
}
