//! Bundle artifact resolution
//!
//! Maps a bundle coordinate to a filesystem location the prepare phase
//! can work from. Network-backed resolution (remote repositories) lives
//! outside this crate; the trait is the seam it plugs into.

use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, Result};

/// Artifact resolver collaborator
pub trait BundleResolver: Send + Sync {
    /// Resolve a coordinate or relative path to a local bundle location
    ///
    /// # Arguments
    ///
    /// * `coordinate` - Bundle identifier (e.g., "jetty/9.4" or a path)
    ///
    /// # Errors
    ///
    /// `BundleNotFound` when the coordinate cannot be resolved
    fn resolve(&self, coordinate: &str) -> Result<PathBuf>;
}

/// Resolver over a local bundle directory tree
///
/// Looks the coordinate up directly under the configured root.
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    /// Create a resolver rooted at a local bundle repository
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirectoryResolver {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl BundleResolver for DirectoryResolver {
    fn resolve(&self, coordinate: &str) -> Result<PathBuf> {
        if coordinate.is_empty() {
            return Err(HarnessError::InvalidArgument(
                "Bundle coordinate cannot be empty".to_string(),
            ));
        }

        let candidate = self.root.join(coordinate);
        if !candidate.exists() {
            return Err(HarnessError::BundleNotFound(format!(
                "{} (looked in {})",
                coordinate,
                self.root.display()
            )));
        }

        Ok(candidate)
    }
}
