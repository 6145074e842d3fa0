//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{self, CredentialStore, StorageKey, StoreChange, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<StorageKey, TokenSecret>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns `true` when no key holds a value.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns the raw value under `key` without going through the async contract.
	pub fn peek(&self, key: StorageKey) -> Option<String> {
		self.0.read().get(&key).map(|secret| secret.expose().to_owned())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: StorageKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn apply(&self, changes: Vec<StoreChange>) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			store::apply_to_map(&mut map.write(), changes);

			Ok(())
		})
	}
}
