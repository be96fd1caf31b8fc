//! The planned contents of the output tree and the step flushing them to disk.
//!
//! Planning never writes anything. Every [`Output`] owns a distinct directory, so flushing the
//! outputs of different branches can not interfere with each other.
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{
    kustomization::{KUSTOMIZATION_FILE_NAME, Kustomization},
    yaml,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create directory {path}", path = path.display()))]
    CreateDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to write file {path}", path = path.display()))]
    WriteFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to serialize kustomization for {path}", path = path.display()))]
    SerializeKustomization { source: yaml::Error, path: PathBuf },

    #[snafu(display("failed to read directory {path}", path = path.display()))]
    ReadDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display(
        "failed to copy {from} to {to}",
        from = from.display(),
        to = to.display()
    ))]
    CopyFile {
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },
}

/// A single directory of the output tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// A root base, copied verbatim.
    Base(CopiedBase),

    /// A generated overlay.
    Overlay(Overlay),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopiedBase {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub directory: PathBuf,
    pub kustomization: Kustomization,
    pub files: Vec<GeneratedFile>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl Output {
    /// The output directory this output is written to.
    pub fn directory(&self) -> &Path {
        match self {
            Self::Base(base) => &base.destination,
            Self::Overlay(overlay) => &overlay.directory,
        }
    }

    pub fn write(&self) -> Result<()> {
        match self {
            Self::Base(base) => base.write(),
            Self::Overlay(overlay) => overlay.write(),
        }
    }
}

/// Writes all `outputs` in order.
pub fn write_all(outputs: &[Output]) -> Result<()> {
    for output in outputs {
        output.write()?;
    }
    Ok(())
}

impl Overlay {
    /// Returns the generated file called `name`, if any.
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|file| file.name == name)
    }

    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    pub fn write(&self) -> Result<()> {
        create_dir_all(&self.directory)?;

        for file in &self.files {
            let path = self.directory.join(&file.name);
            std::fs::write(&path, &file.contents).context(WriteFileSnafu { path })?;
        }

        let path = self.directory.join(KUSTOMIZATION_FILE_NAME);
        let contents = yaml::to_string(&self.kustomization)
            .context(SerializeKustomizationSnafu { path: path.clone() })?;
        std::fs::write(&path, contents).context(WriteFileSnafu { path })?;

        debug!(files = self.files.len(), "wrote overlay");
        Ok(())
    }
}

impl CopiedBase {
    #[instrument(skip(self), fields(source = %self.source.display(), destination = %self.destination.display()))]
    pub fn write(&self) -> Result<()> {
        copy_dir(&self.source, &self.destination, &self.destination)?;
        debug!("copied base");
        Ok(())
    }
}

/// Recursively copies `from` into `to`, skipping `skip` in case the destination lies within the
/// source tree.
fn copy_dir(from: &Path, to: &Path, skip: &Path) -> Result<()> {
    create_dir_all(to)?;

    let mut entries = std::fs::read_dir(from)
        .context(ReadDirectorySnafu { path: from })?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .context(ReadDirectorySnafu { path: from })?;
    entries.sort();

    for entry in entries {
        if entry == skip {
            continue;
        }
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = to.join(name);

        if entry.is_dir() {
            copy_dir(&entry, &target, skip)?;
        } else {
            std::fs::copy(&entry, &target).context(CopyFileSnafu {
                from: entry.clone(),
                to: target.clone(),
            })?;
        }
    }

    Ok(())
}

fn create_dir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).context(CreateDirectorySnafu { path })
}
