//! Staged, all-or-nothing output
//!
//! The writer claims a staging directory next to the final location before
//! anything is written. On commit, the HTML and resource files are written
//! into staging and then moved into place with renames. Until that last
//! step succeeds nothing outside the staging directory changes, and the
//! staging directory is removed when the writer goes away.

use crate::resources::CachedResource;
use crate::OutputError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Paths of a committed book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub html: PathBuf,
    pub resource_dir: PathBuf,
}

/// Writes `<basename>.html` and `<basename>_files/` into an output directory
#[derive(Debug)]
pub struct OutputWriter {
    output_dir: PathBuf,
    basename: String,
    staging: TempDir,
}

impl OutputWriter {
    /// Acquires the output location
    ///
    /// Creates `output_dir` if needed and a staging directory inside it.
    /// Fails if either cannot be created.
    pub fn prepare(output_dir: &Path, basename: &str) -> Result<Self, OutputError> {
        fs::create_dir_all(output_dir).map_err(|source| OutputError::Acquire {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let staging = tempfile::Builder::new()
            .prefix(".chapter-binder-")
            .tempdir_in(output_dir)
            .map_err(|source| OutputError::Acquire {
                path: output_dir.to_path_buf(),
                source,
            })?;
        tracing::debug!("Staging output in {}", staging.path().display());

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            basename: basename.to_string(),
            staging,
        })
    }

    /// Name of the resource directory, as referenced from the HTML
    pub fn resource_dir_name(&self) -> String {
        format!("{}_files", self.basename)
    }

    pub fn html_file_name(&self) -> String {
        format!("{}.html", self.basename)
    }

    /// Final paths the book will be written to
    pub fn paths(&self) -> OutputPaths {
        OutputPaths {
            html: self.output_dir.join(self.html_file_name()),
            resource_dir: self.output_dir.join(self.resource_dir_name()),
        }
    }

    /// Writes the book and moves it into place, replacing earlier output
    pub fn commit(self, html: &str, resources: &[CachedResource]) -> Result<OutputPaths, OutputError> {
        let staged_dir = self.staging.path().join(self.resource_dir_name());
        let staged_html = self.staging.path().join(self.html_file_name());

        fs::create_dir(&staged_dir).map_err(write_error(&staged_dir))?;
        for resource in resources {
            let path = staged_dir.join(&resource.local_path);
            fs::write(&path, &resource.content).map_err(write_error(&path))?;
        }
        fs::write(&staged_html, html).map_err(write_error(&staged_html))?;

        let paths = self.paths();
        let backup = self.staging.path().join("previous");
        fs::create_dir(&backup).map_err(write_error(&backup))?;

        let moves = [
            (staged_dir, paths.resource_dir.clone()),
            (staged_html, paths.html.clone()),
        ];
        let mut installed: Vec<&PathBuf> = Vec::new();
        let mut displaced: Vec<(PathBuf, &PathBuf)> = Vec::new();

        for (index, (staged, target)) in moves.iter().enumerate() {
            let result = displace(target, &backup.join(index.to_string())).and_then(|saved| {
                if let Some(saved) = saved {
                    displaced.push((saved, target));
                }
                fs::rename(staged, target)
            });

            if let Err(source) = result {
                rollback(&installed, &displaced);
                return Err(OutputError::Write {
                    path: target.clone(),
                    source,
                });
            }
            installed.push(target);
        }

        tracing::info!(
            "Wrote {} and {} resources to {}",
            paths.html.display(),
            resources.len(),
            paths.resource_dir.display()
        );
        Ok(paths)
    }
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Moves an existing file or directory out of the way; returns where it went
fn displace(target: &Path, backup: &Path) -> io::Result<Option<PathBuf>> {
    match fs::symlink_metadata(target) {
        Ok(_) => {
            fs::rename(target, backup)?;
            Ok(Some(backup.to_path_buf()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Removes what was installed and restores what was displaced
fn rollback(installed: &[&PathBuf], displaced: &[(PathBuf, &PathBuf)]) {
    for target in installed {
        let removed = if target.is_dir() {
            fs::remove_dir_all(target)
        } else {
            fs::remove_file(target)
        };
        if let Err(e) = removed {
            tracing::warn!("Could not remove {}: {}", target.display(), e);
        }
    }
    for (saved, target) in displaced {
        if let Err(e) = fs::rename(saved, target) {
            tracing::warn!("Could not restore {}: {}", target.display(), e);
        }
    }
}
