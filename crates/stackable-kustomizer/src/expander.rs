//! Expansion of a [`Profile`] into the overlay tree it describes.
//!
//! Every variable generates one overlay (or, for a [`VariableSource::Dir`], one overlay per
//! subdirectory) whose base is the overlay generated for the preceding variable. Whenever more
//! variables follow, the overlay is placed in a `base` directory, so that the overlays of the
//! following variables end up as its siblings:
//!
//! ```text
//! out/zookeeper/base        <- base: zookeeper
//! out/zookeeper/aws/base    <- dir: cloud (subdirectory aws)
//! out/zookeeper/aws/tls     <- base: tls
//! ```
//!
//! A variable marked with `fork` additionally lets the preceding overlay continue with the
//! variable after it, so that both continuations extend the same overlay.
//!
//! Expansion only plans the outputs, [`crate::output::write_all`] flushes them.
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{
    output::Output,
    overlay::{self, OverlayRequest},
    patch::TypeRegistry,
    profile::{Profile, Variable, VariableSource},
};

/// The directory name an overlay is placed in when further variables build on top of it.
pub const BASE_DIR_NAME: &str = "base";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to list subdirectories of {dir}", dir = dir.display()))]
    ListDirectory {
        source: std::io::Error,
        dir: PathBuf,
    },

    #[snafu(display(
        "failed to generate overlay for {variable} in {root_dir}",
        root_dir = root_dir.display(),
        variable = variable.display()
    ))]
    GenerateOverlay {
        source: overlay::Error,
        root_dir: PathBuf,
        variable: PathBuf,
    },
}

/// Access to the source configuration directories.
pub trait Source {
    /// Returns the names of the immediate subdirectories of `dir`, sorted by name.
    fn subdirectories(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>>;

    /// Generates the output for a single variable.
    fn generate(&self, request: &OverlayRequest<'_>) -> Result<Output, overlay::Error>;
}

/// A [`Source`] reading configuration directories from the local filesystem.
#[derive(Debug, Default)]
pub struct FsSource {
    registry: TypeRegistry,
}

impl FsSource {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }
}

impl Source for FsSource {
    fn subdirectories(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(PathBuf::from(entry.file_name()));
            }
        }
        names.sort();
        Ok(names)
    }

    fn generate(&self, request: &OverlayRequest<'_>) -> Result<Output, overlay::Error> {
        overlay::generate_overlay(&self.registry, request)
    }
}

/// Plans all outputs of `profile`, reading sources relative to `root_dir` and placing the
/// overlay tree below `output_dir`.
///
/// The outputs are returned in generation order, so every overlay comes after its base.
#[instrument(skip(source, profile), fields(
    root_dir = %root_dir.display(),
    output_dir = %output_dir.display(),
))]
pub fn plan<S: Source>(
    source: &S,
    root_dir: &Path,
    output_dir: &Path,
    profile: &Profile,
) -> Result<Vec<Output>> {
    let mut expander = Expander {
        source,
        root_dir,
        outputs: Vec::new(),
    };
    expander.expand(None, output_dir, profile.variables())?;

    debug!(outputs = expander.outputs.len(), "planned profile");
    Ok(expander.outputs)
}

struct Expander<'a, S> {
    source: &'a S,
    root_dir: &'a Path,
    outputs: Vec<Output>,
}

impl<S: Source> Expander<'_, S> {
    fn expand(
        &mut self,
        parent_output: Option<&Path>,
        output_dir: &Path,
        variables: &[Variable],
    ) -> Result<()> {
        let Some((head, tail)) = variables.split_first() else {
            return Ok(());
        };

        match &head.source {
            VariableSource::Base(base) => {
                let segment = base.file_name().map_or(base.as_path(), Path::new);
                let mut next_output = output_dir.join(segment);
                if !tail.is_empty() && !next_output.ends_with(BASE_DIR_NAME) {
                    next_output.push(BASE_DIR_NAME);
                }

                let root_dir = self.root_dir;
                self.branch(root_dir, base, parent_output, &next_output, variables)
            }
            VariableSource::Dir(dir) => {
                let listing_root = self.root_dir.join(dir);
                let names = self
                    .source
                    .subdirectories(&listing_root)
                    .context(ListDirectorySnafu {
                        dir: listing_root.clone(),
                    })?;

                for name in names {
                    let mut next_output = output_dir.join(&name);
                    if !tail.is_empty() {
                        next_output.push(BASE_DIR_NAME);
                    }

                    self.branch(&listing_root, &name, parent_output, &next_output, variables)?;
                }
                Ok(())
            }
        }
    }

    /// Generates the overlay for the head of `variables` and continues with the rest.
    fn branch(
        &mut self,
        root_dir: &Path,
        variable: &Path,
        parent_output: Option<&Path>,
        output_dir: &Path,
        variables: &[Variable],
    ) -> Result<()> {
        let request = OverlayRequest {
            root_dir,
            variable,
            parent_output,
            output_dir,
        };
        let output = self
            .source
            .generate(&request)
            .context(GenerateOverlaySnafu { root_dir, variable })?;
        self.outputs.push(output);

        let siblings_dir = output_dir.parent().unwrap_or_else(|| Path::new(""));
        self.expand(Some(output_dir), siblings_dir, &variables[1..])?;

        if variables.len() > 2 && variables[1].fork {
            debug!(
                output_dir = %output_dir.display(),
                "forking, also continuing without the next variable"
            );
            self.expand(Some(output_dir), siblings_dir, &variables[2..])?;
        }

        Ok(())
    }
}
