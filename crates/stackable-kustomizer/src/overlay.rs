//! The diff-and-patch pipeline for a single variable: load the target directory and its base,
//! classify the target objects, compute their patches, name the files and assemble the
//! kustomization of the new overlay.
use std::path::{Path, PathBuf};

use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{
    diff::{self, Change, Classified},
    identity::ResourceIdentity,
    kustomization::{self, JsonPatchReference, Kustomization},
    naming::{self, Category, NamingEntry},
    output::{CopiedBase, GeneratedFile, Output, Overlay},
    paths::relative_path,
    patch::{self, GeneratedPatch, TypeRegistry},
    resource_set::{self, ResourceSet},
    yaml,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load kustomization"))]
    LoadManifest { source: kustomization::Error },

    #[snafu(display("failed to load resources of {dir}", dir = dir.display()))]
    LoadResources {
        source: resource_set::Error,
        dir: PathBuf,
    },

    #[snafu(display("failed to generate patch for {identity}"))]
    GeneratePatch {
        source: patch::Error,
        identity: ResourceIdentity,
    },

    #[snafu(display(
        "naming conflict for rootDir={root_dir} variable={variable}",
        root_dir = root_dir.display(),
        variable = variable.display()
    ))]
    NamingConflict { root_dir: PathBuf, variable: PathBuf },

    #[snafu(display("failed to serialize {file}"))]
    SerializeFile { source: yaml::Error, file: String },
}

/// Describes one invocation of the pipeline.
#[derive(Clone, Copy, Debug)]
pub struct OverlayRequest<'a> {
    /// The directory `variable` is relative to.
    pub root_dir: &'a Path,

    /// The source configuration directory, relative to `root_dir`.
    pub variable: &'a Path,

    /// The output directory of the parent overlay, if there is one.
    pub parent_output: Option<&'a Path>,

    /// The directory the result is written to.
    pub output_dir: &'a Path,
}

impl OverlayRequest<'_> {
    pub fn source_dir(&self) -> PathBuf {
        self.root_dir.join(self.variable)
    }
}

/// Runs the pipeline for `request`.
///
/// A source directory without a base is a root base and is copied as is. Otherwise the objects
/// of the source directory are expressed relative to the objects of its base.
#[instrument(skip(registry, request), fields(
    root_dir = %request.root_dir.display(),
    variable = %request.variable.display(),
    output_dir = %request.output_dir.display(),
))]
pub fn generate_overlay(registry: &TypeRegistry, request: &OverlayRequest<'_>) -> Result<Output> {
    let source_dir = request.source_dir();
    let manifest_path = Kustomization::locate(&source_dir).context(LoadManifestSnafu)?;
    let manifest = Kustomization::load_file(&manifest_path).context(LoadManifestSnafu)?;

    let Some(base) = manifest
        .single_base(&manifest_path)
        .context(LoadManifestSnafu)?
    else {
        debug!("source directory is a root base, copying it");
        return Ok(Output::Base(CopiedBase {
            source: source_dir,
            destination: request.output_dir.to_path_buf(),
        }));
    };

    let target = ResourceSet::load(&source_dir, &manifest.resources).context(LoadResourcesSnafu {
        dir: source_dir.clone(),
    })?;

    let base_dir = source_dir.join(base);
    let base_manifest = Kustomization::load(&base_dir).context(LoadManifestSnafu)?;
    let base = ResourceSet::load(&base_dir, &base_manifest.resources)
        .context(LoadResourcesSnafu { dir: base_dir })?;

    build_overlay(registry, request, &target, &base).map(Output::Overlay)
}

/// Builds the overlay expressing `target` relative to `base`.
pub fn build_overlay(
    registry: &TypeRegistry,
    request: &OverlayRequest<'_>,
    target: &ResourceSet,
    base: &ResourceSet,
) -> Result<Overlay> {
    let classified = diff::classify(target, base);

    for identity in diff::removed(target, base) {
        debug!(%identity, "object only exists in the base, deletions are not represented");
    }

    let entries = classified
        .iter()
        .map(naming_entry)
        .collect::<Result<Vec<_>>>()?;
    let granularity = naming::resolve(&entries).context(NamingConflictSnafu {
        root_dir: request.root_dir,
        variable: request.variable,
    })?;
    debug!(?granularity, "resolved file naming");

    let mut kustomization = Kustomization::new();
    if let Some(parent_output) = request.parent_output {
        let relative_base = relative_path(request.output_dir, parent_output);
        kustomization
            .bases
            .push(relative_base.to_string_lossy().into_owned());
    }

    let mut files = Vec::new();
    for (classified, entry) in classified.iter().zip(&entries) {
        let generated = patch::generate(registry, classified.identity, &classified.change)
            .with_context(|_| GeneratePatchSnafu {
                identity: classified.identity.clone(),
            })?;
        let name = entry.file_name(granularity);

        let contents = match generated {
            Some(GeneratedPatch::StrategicMerge(patch)) => {
                kustomization.patches_strategic_merge.push(name.clone());
                yaml::to_string(&patch)
            }
            Some(GeneratedPatch::Json6902 { patch, target }) => {
                kustomization.patches_json6902.push(JsonPatchReference {
                    target,
                    path: name.clone(),
                });
                yaml::to_string(&patch)
            }
            Some(GeneratedPatch::Resource(object)) => {
                kustomization.resources.push(name.clone());
                yaml::to_string(&object)
            }
            None => {
                debug!(identity = %classified.identity, "object is unchanged, skipping it");
                continue;
            }
        }
        .context(SerializeFileSnafu { file: name.clone() })?;

        files.push(GeneratedFile { name, contents });
    }

    kustomization.resources.sort();

    Ok(Overlay {
        directory: request.output_dir.to_path_buf(),
        kustomization,
        files,
    })
}

fn naming_entry<'a>(classified: &Classified<'a>) -> Result<NamingEntry<'a>> {
    let category = match classified.change {
        Change::Added { .. } => Category::Resource,
        Change::Modified { .. } => {
            let official = patch::is_official(classified.identity).with_context(|_| {
                GeneratePatchSnafu {
                    identity: classified.identity.clone(),
                }
            })?;
            if official {
                Category::StrategicMerge
            } else {
                Category::JsonPatch
            }
        }
    };

    Ok(NamingEntry {
        category,
        name: &classified.identity.name,
        kind: &classified.identity.kind,
    })
}
