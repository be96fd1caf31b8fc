//! Generation of kustomize overlay trees from fully rendered configuration variants.
//!
//! Every source configuration directory contains the complete set of objects of one variant and
//! references the variant it derives from via its kustomization `bases`. This crate expresses each
//! variant as an overlay of minimal patches relative to its base:
//!
//! - Objects of official Kubernetes API groups become strategic merge patches.
//! - All other objects (usually custom resources) become JSON 6902 patches.
//! - Objects which do not exist in the base are added as resources.
//!
//! A [`Profile`] describes how variants are stacked on top of each other. [`expander::plan`]
//! turns a profile into a list of [`Output`]s, which [`output::write_all`] flushes to disk.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use stackable_kustomizer::{FsSource, KustomizerConfig, expander, output};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KustomizerConfig::load(Path::new("in/kustomizer.yaml"))?;
//! let source = FsSource::default();
//!
//! for profile in config.profiles.values() {
//!     let outputs = expander::plan(&source, Path::new("in"), Path::new("out"), profile)?;
//!     output::write_all(&outputs)?;
//! }
//! # Ok(())
//! # }
//! ```
pub mod api_version;
pub mod diff;
pub mod expander;
pub mod identity;
pub mod kustomization;
pub mod naming;
pub mod output;
pub mod overlay;
pub mod patch;
pub mod paths;
pub mod profile;
pub mod resource_set;
pub mod yaml;

pub use expander::{FsSource, Source};
pub use identity::ResourceIdentity;
pub use output::Output;
pub use patch::TypeRegistry;
pub use profile::{KustomizerConfig, Profile, Variable, VariableSource};
pub use resource_set::ResourceSet;
