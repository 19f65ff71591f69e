// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Virtual File System (VFS) for resource names.
//!
//! The [`Vfs`] is the single entry point the resource manager uses to turn a
//! name into bytes. Resolution order is fixed:
//!
//! 1. registered packages, most recently registered first, matched by prefix;
//! 2. `host:<path>`, used verbatim on the host filesystem;
//! 3. `/<path>`, used verbatim on the host filesystem;
//! 4. anything else, relative to the resolver's base directory.

use crate::host;
use crate::path::PathResolver;
use crate::registry::{PackageRegistry, PackageToken};
use sil_core::config::PathSettings;
use sil_core::{FileRegion, PackageModule, ResourceError, MAX_LIST_DEPTH};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use walkdir::WalkDir;

/// The producer a name resolved to.
#[derive(Debug, Clone)]
pub enum Resolved<'n> {
    /// A registered package, with the name relative to its root.
    Package {
        /// The package that claimed the name.
        module: Arc<dyn PackageModule>,
        /// The name with the package prefix stripped.
        name: &'n str,
    },
    /// A path on the host filesystem.
    Host(PathBuf),
}

/// Resolves resource names against registered packages and the host filesystem.
#[derive(Debug)]
pub struct Vfs {
    registry: PackageRegistry,
    resolver: RwLock<PathResolver>,
}

impl Vfs {
    /// Creates a VFS with no packages, resolving host names per `settings`.
    pub fn new(settings: &PathSettings) -> Self {
        Self::with_resolver(PathResolver::from_settings(settings))
    }

    /// Creates a VFS around an explicit host path resolver.
    pub fn with_resolver(resolver: PathResolver) -> Self {
        Self {
            registry: PackageRegistry::new(),
            resolver: RwLock::new(resolver),
        }
    }

    /// The package registry consulted before the host filesystem.
    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    /// Registers a package on top of the stack.
    pub fn register(&self, module: Arc<dyn PackageModule>) -> PackageToken {
        self.registry.register(module)
    }

    /// Removes a package registration.
    pub fn unregister(&self, token: PackageToken) -> Option<Arc<dyn PackageModule>> {
        self.registry.unregister(token)
    }

    /// Enables or disables resolution to the host filesystem.
    pub fn set_host_access(&self, enabled: bool) {
        self.resolver
            .write()
            .expect("path resolver lock poisoned")
            .set_host_access(enabled);
    }

    /// Whether names may resolve to the host filesystem.
    pub fn host_access(&self) -> bool {
        self.resolver().host_access()
    }

    /// Resolves `name` to a package or a host path.
    ///
    /// # Errors
    /// [`ResourceError::Disabled`] or [`ResourceError::PathTooLong`] for names
    /// that fall through to the host filesystem.
    pub fn resolve<'n>(&self, name: &'n str) -> Result<Resolved<'n>, ResourceError> {
        if let Some((module, name)) = self.registry.resolve(name) {
            return Ok(Resolved::Package { module, name });
        }
        self.resolver().host_path(name).map(Resolved::Host)
    }

    /// Returns `true` iff `name` resolves to an existing file.
    pub fn exists(&self, name: &str) -> bool {
        match self.resolve(name) {
            Ok(Resolved::Package { module, name }) => module.exists(name),
            Ok(Resolved::Host(path)) => host::exists(&path),
            Err(_) => false,
        }
    }

    /// Decoded size of `name`, if it exists.
    pub fn size(&self, name: &str) -> Option<u64> {
        match self.resolve(name).ok()? {
            Resolved::Package { module, name } => module.size(name),
            Resolved::Host(path) => host::size(&path),
        }
    }

    /// Opens `name` for sequential reading.
    ///
    /// Compressed package entries are decoded transparently.
    pub fn open_for_read(&self, name: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        match self.resolve(name)? {
            Resolved::Package { module, name } => module.open(name),
            Resolved::Host(path) => host::open(&path),
        }
    }

    /// `(compressed_size, decompressed_size)` of a compressed package entry.
    ///
    /// Always `None` for host files.
    pub fn compressed_extent(&self, name: &str) -> Option<(u64, u64)> {
        match self.resolve(name).ok()? {
            Resolved::Package { module, name } => module.compressed_extent(name),
            Resolved::Host(_) => None,
        }
    }

    /// Returns a random-access window onto `name`.
    ///
    /// # Errors
    /// [`ResourceError::CompressedInPackage`] for compressed package entries.
    pub fn file_region(&self, name: &str) -> Result<FileRegion, ResourceError> {
        match self.resolve(name)? {
            Resolved::Package { module, name } => module.file_region(name),
            Resolved::Host(path) => host::file_region(&path),
        }
    }

    /// Lists the files under `dir`, with names relative to `dir`.
    ///
    /// Recursive listings descend at most [`MAX_LIST_DEPTH`] levels below `dir`.
    pub fn list(&self, dir: &str, recursive: bool) -> Result<DirListing, ResourceError> {
        match self.resolve(dir)? {
            Resolved::Package { module, name } => {
                let names = module.list(name, recursive)?;
                Ok(DirListing::package(names))
            }
            Resolved::Host(path) => DirListing::host(path, recursive),
        }
    }

    fn resolver(&self) -> std::sync::RwLockReadGuard<'_, PathResolver> {
        self.resolver.read().expect("path resolver lock poisoned")
    }
}

/// An iterator over the file names of one directory listing.
///
/// Host listings walk the directory lazily; dropping the iterator releases
/// every open directory handle.
#[derive(Debug)]
pub struct DirListing {
    inner: ListingInner,
}

#[derive(Debug)]
enum ListingInner {
    Package(std::vec::IntoIter<String>),
    Host {
        root: PathBuf,
        walker: walkdir::IntoIter,
    },
}

impl DirListing {
    fn package(names: Vec<String>) -> Self {
        Self {
            inner: ListingInner::Package(names.into_iter()),
        }
    }

    fn host(root: PathBuf, recursive: bool) -> Result<Self, ResourceError> {
        if !root.is_dir() {
            return Err(ResourceError::NotFound(root.display().to_string()));
        }
        let max_depth = if recursive { MAX_LIST_DEPTH + 1 } else { 1 };
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();
        Ok(Self {
            inner: ListingInner::Host { root, walker },
        })
    }
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

impl Iterator for DirListing {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match &mut self.inner {
            ListingInner::Package(names) => names.next(),
            ListingInner::Host { root, walker } => loop {
                let entry = match walker.next()? {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::trace!("Skipping unreadable directory entry: {err}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                match relative_name(root, entry.path()) {
                    Some(name) => return Some(name),
                    None => log::trace!(
                        "Skipping non UTF-8 path '{}'",
                        entry.path().display()
                    ),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPackage;
    use tempfile::tempdir;

    fn vfs_in(dir: &Path) -> Vfs {
        Vfs::with_resolver(PathResolver::new(dir.to_string_lossy(), true))
    }

    #[test]
    fn packages_shadow_host_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"host").unwrap();
        let vfs = vfs_in(dir.path());

        assert_eq!(vfs.size("a.txt"), Some(4));
        let token = vfs.register(Arc::new(
            MemoryPackage::new("").with_file("a.txt", b"package".to_vec()),
        ));
        assert_eq!(vfs.size("a.txt"), Some(7));
        vfs.unregister(token);
        assert_eq!(vfs.size("a.txt"), Some(4));
    }

    #[test]
    fn host_escape_bypasses_empty_prefix_package() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.txt");
        std::fs::write(&path, b"bb").unwrap();
        let vfs = vfs_in(dir.path());
        vfs.register(Arc::new(MemoryPackage::new("")));

        let escaped = format!("host:{}", path.display());
        assert!(vfs.exists(&escaped));
        assert!(!vfs.exists("b.txt"));
    }

    #[test]
    fn disabled_host_access_only_affects_host_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("c.txt"), b"c").unwrap();
        let vfs = vfs_in(dir.path());
        vfs.register(Arc::new(
            MemoryPackage::new("pkg:").with_file("c.txt", b"c".to_vec()),
        ));
        vfs.set_host_access(false);

        assert!(!vfs.host_access());
        assert!(vfs.exists("pkg:c.txt"));
        assert!(!vfs.exists("c.txt"));
        assert_eq!(
            vfs.open_for_read("c.txt").err(),
            Some(ResourceError::Disabled("c.txt".into()))
        );
    }

    #[test]
    fn host_listing_is_relative_and_depth_limited() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("res");
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::write(root.join("top.txt"), b"").unwrap();
        std::fs::write(root.join("sub/mid.txt"), b"").unwrap();
        std::fs::write(root.join("sub/deeper/low.txt"), b"").unwrap();
        let vfs = vfs_in(dir.path());

        let flat: Vec<String> = vfs.list("res", false).unwrap().collect();
        assert_eq!(flat, vec!["top.txt"]);

        let mut all: Vec<String> = vfs.list("res", true).unwrap().collect();
        all.sort();
        assert_eq!(all, vec!["sub/deeper/low.txt", "sub/mid.txt", "top.txt"]);

        assert!(matches!(
            vfs.list("missing", false),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn compressed_extent_is_package_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("h.bin"), vec![0u8; 64]).unwrap();
        let vfs = vfs_in(dir.path());
        vfs.register(Arc::new(MemoryPackage::new("z:").with_compressed_file(
            "h.bin",
            &[0u8; 64],
            16,
        )));

        assert!(vfs.compressed_extent("h.bin").is_none());
        let (_, size) = vfs.compressed_extent("z:h.bin").unwrap();
        assert_eq!(size, 64);
        assert!(matches!(
            vfs.file_region("z:h.bin"),
            Err(ResourceError::CompressedInPackage(_))
        ));
        assert_eq!(vfs.file_region("h.bin").unwrap().len(), 64);
    }
}
