//! Concurrent name to provider table
//!
//! Lookups take a shared read lock on the table only. Registration and
//! removal for one name are serialized by a per-name mutex, held across the
//! (possibly slow) content root probe, so an `unregister` that starts after a
//! `register` for the same name always observes and removes its result.
//! Operations on different names never wait on each other's probes.

use crate::provider::{ProviderHandle, ProviderListener, StaticRootPolicy};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of providers currently exposing static content
pub struct ProviderRegistry {
	policy: StaticRootPolicy,
	providers: RwLock<HashMap<String, ProviderHandle>>,
	name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProviderRegistry {
	/// Creates an empty registry using `policy` to qualify providers.
	pub fn new(policy: StaticRootPolicy) -> Self {
		Self {
			policy,
			providers: RwLock::new(HashMap::new()),
			name_locks: Mutex::new(HashMap::new()),
		}
	}

	/// The content root policy.
	pub fn policy(&self) -> StaticRootPolicy {
		self.policy
	}

	/// Adds or replaces the provider under `name`
	///
	/// The provider is only registered when it has entries under the content
	/// root for `name` (see [`StaticRootPolicy::probe_root`]). Returns whether
	/// it was registered; `false` means "not a content provider", not an error.
	pub fn register(&self, name: impl Into<String>, provider: ProviderHandle) -> bool {
		let name = name.into();
		self.with_name_lock(&name, || {
			if !self.policy.qualifies(&name, provider.as_ref()) {
				tracing::debug!(
					provider = %name,
					root = %self.policy.probe_root(&name),
					"ignoring provider without static content"
				);
				return false;
			}

			let previous = self.providers.write().insert(name.clone(), provider);
			if previous.is_some() {
				tracing::debug!(provider = %name, "replaced content provider");
			} else {
				tracing::debug!(provider = %name, "registered content provider");
			}
			true
		})
	}

	/// Removes the provider under `name`, returning it if present.
	pub fn unregister(&self, name: &str) -> Option<ProviderHandle> {
		self.with_name_lock(name, || {
			let removed = self.providers.write().remove(name);
			if removed.is_some() {
				tracing::debug!(provider = %name, "unregistered content provider");
			}
			removed
		})
	}

	/// Returns the provider registered under `name`.
	pub fn lookup(&self, name: &str) -> Option<ProviderHandle> {
		self.providers.read().get(name).cloned()
	}

	/// Whether a provider is registered under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.providers.read().contains_key(name)
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
		names.sort();
		names
	}

	/// Number of registered providers.
	pub fn len(&self) -> usize {
		self.providers.read().len()
	}

	/// Whether no provider is registered.
	pub fn is_empty(&self) -> bool {
		self.providers.read().is_empty()
	}

	fn with_name_lock<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
		let lock = Arc::clone(self.name_locks.lock().entry(name.to_string()).or_default());

		let result = {
			let _guard = lock.lock();
			f()
		};

		// Clones are only taken under `name_locks`, so a count of two (map +
		// ours) means nobody else is waiting on this name.
		let mut locks = self.name_locks.lock();
		if Arc::strong_count(&lock) == 2 {
			locks.remove(name);
		}
		result
	}
}

impl Default for ProviderRegistry {
	fn default() -> Self {
		Self::new(StaticRootPolicy::default())
	}
}

impl ProviderListener for ProviderRegistry {
	fn on_provider_appeared(&self, provider: ProviderHandle) {
		let name = provider.name().to_string();
		self.register(name, provider);
	}

	fn on_provider_disappeared(&self, name: &str) {
		self.unregister(name);
	}
}
