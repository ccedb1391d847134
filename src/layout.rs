//! Path resolution for installed packages.
//!
//! The engine never walks directories itself; a layout collaborator maps a
//! package name and a manifest-relative path to a concrete destination, or
//! declares the entry not checkable (generated files, mutable state).

use std::path::{Component, Path, PathBuf};

/// Where a manifest entry lives on disk, if anywhere checkable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    NotCheckable,
}

/// Resolves package documents and manifest entries to on-disk paths
pub trait PackageLayout: Send + Sync {
    /// The package's detached manifest-signature document, if the layout
    /// knows where one would live
    fn signature_document(&self, package: &str) -> Option<PathBuf>;

    /// Destination of one manifest entry
    fn destination(&self, package: &str, entry: &str) -> Destination;
}

/// Conventional layout: each package installed under `<root>/<package>/`,
/// with its signed manifest at `<root>/<package>/manifest.asc`.
#[derive(Debug, Clone)]
pub struct DirLayout {
    root: PathBuf,
}

impl DirLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirLayout { root: root.into() }
    }
}

impl PackageLayout for DirLayout {
    fn signature_document(&self, package: &str) -> Option<PathBuf> {
        Some(self.root.join(package).join("manifest.asc"))
    }

    fn destination(&self, package: &str, entry: &str) -> Destination {
        let relative = Path::new(entry);
        // Absolute entries and any that escape the package tree cannot be
        // checked against this layout
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Destination::NotCheckable;
        }
        Destination::File(self.root.join(package).join(relative))
    }
}
