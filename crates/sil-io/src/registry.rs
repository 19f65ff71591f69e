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

//! The ordered stack of registered package modules.

use crate::path::HOST_PREFIX;
use sil_core::PackageModule;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identifies one registration, used to unregister it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageToken(u64);

#[derive(Debug, Clone)]
struct Registered {
    token: PackageToken,
    module: Arc<dyn PackageModule>,
}

/// An immutable view of the registry at one point in time.
pub type RegistrySnapshot = Arc<Vec<Arc<dyn PackageModule>>>;

/// An ordered list of package modules; later registrations take precedence.
///
/// Writers replace the whole list, readers work on an immutable snapshot, so
/// a lookup never observes a half-applied registration.
#[derive(Debug, Default)]
pub struct PackageRegistry {
    entries: RwLock<Arc<Vec<Registered>>>,
    next_token: AtomicU64,
}

impl PackageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `module` on top of the stack.
    pub fn register(&self, module: Arc<dyn PackageModule>) -> PackageToken {
        let token = PackageToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        log::info!("Registering package with prefix '{}'", module.prefix());
        let mut guard = self.entries.write().expect("package registry lock poisoned");
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(Registered { token, module });
        *guard = Arc::new(next);
        token
    }

    /// Removes a registration, restoring visibility of earlier packages.
    ///
    /// Returns the removed module, or `None` if the token is unknown.
    pub fn unregister(&self, token: PackageToken) -> Option<Arc<dyn PackageModule>> {
        let mut guard = self.entries.write().expect("package registry lock poisoned");
        let pos = guard.iter().position(|r| r.token == token)?;
        let mut next: Vec<Registered> = (**guard).clone();
        let removed = next.remove(pos);
        *guard = Arc::new(next);
        log::info!(
            "Unregistered package with prefix '{}'",
            removed.module.prefix()
        );
        Some(removed.module)
    }

    /// Number of registered packages.
    pub fn len(&self) -> usize {
        self.current().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    /// Returns the modules from most to least recently registered.
    pub fn snapshot(&self) -> RegistrySnapshot {
        Arc::new(
            self.current()
                .iter()
                .rev()
                .map(|r| r.module.clone())
                .collect(),
        )
    }

    /// Finds the package that claims `name`.
    ///
    /// Returns the module and the name with its prefix stripped.
    pub fn resolve<'n>(&self, name: &'n str) -> Option<(Arc<dyn PackageModule>, &'n str)> {
        self.current().iter().rev().find_map(|r| {
            let rest = claim(r.module.prefix(), name)?;
            Some((r.module.clone(), rest))
        })
    }

    fn current(&self) -> Arc<Vec<Registered>> {
        self.entries
            .read()
            .expect("package registry lock poisoned")
            .clone()
    }
}

/// Strips `prefix` from `name` if a package with that prefix claims it.
fn claim<'n>(prefix: &str, name: &'n str) -> Option<&'n str> {
    if prefix.is_empty() && (name.starts_with(HOST_PREFIX) || name.starts_with('/')) {
        return None;
    }
    name.strip_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPackage;

    #[test]
    fn later_registration_wins() {
        let registry = PackageRegistry::new();
        let a = Arc::new(MemoryPackage::new("pkg:").with_file("f", b"A".to_vec()));
        let b = Arc::new(MemoryPackage::new("pkg:").with_file("f", b"B".to_vec()));
        let _ta = registry.register(a);
        let tb = registry.register(b);

        let (module, rest) = registry.resolve("pkg:f").unwrap();
        assert_eq!(rest, "f");
        assert_eq!(module.size(rest), Some(1));
        assert_eq!(registry.snapshot().len(), 2);

        assert!(registry.unregister(tb).is_some());
        assert!(registry.unregister(tb).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_prefix_skips_host_names() {
        assert_eq!(claim("", "a/b"), Some("a/b"));
        assert_eq!(claim("", "host:a"), None);
        assert_eq!(claim("", "/abs"), None);
        assert_eq!(claim("pkg:", "pkg:x"), Some("x"));
        assert_eq!(claim("pkg:", "other:x"), None);
    }
}
