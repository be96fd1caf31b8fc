use std::{fmt::Display, str::FromStr};

use snafu::{Snafu, ensure};

/// Group suffixes which mark an API group as maintained by the Kubernetes project itself.
pub const OFFICIAL_GROUP_SUFFIXES: &[&str] = &[".k8s.io"];

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseGroupVersionError {
    #[snafu(display("unexpected group version {input:?}, expected at most one '/'"))]
    TooManySlashes { input: String },
}

/// The `(<GROUP>/)<VERSION>` pair of an `apiVersion` field, for example `apps/v1` or `v1`.
///
/// Unlike a fully validated Kubernetes API version this type accepts any version string, because
/// custom resources are free to choose their own version names. The core group is represented by
/// an empty `group`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl FromStr for GroupVersion {
    type Err = ParseGroupVersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() || input == "/" {
            return Ok(Self::default());
        }

        ensure!(
            input.matches('/').count() <= 1,
            TooManySlashesSnafu { input }
        );

        let (group, version) = match input.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", input),
        };

        Ok(Self {
            group: group.to_owned(),
            version: version.to_owned(),
        })
    }
}

impl Display for GroupVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

impl GroupVersion {
    /// Returns whether objects of this group are built-in Kubernetes types.
    ///
    /// This is the case for the core group, for legacy groups without a dot (`apps`, `batch`,
    /// ...) and for groups ending in one of the [`OFFICIAL_GROUP_SUFFIXES`].
    pub fn is_official(&self) -> bool {
        self.group.is_empty()
            || !self.group.contains('.')
            || OFFICIAL_GROUP_SUFFIXES
                .iter()
                .any(|suffix| self.group.ends_with(suffix))
    }
}
