//! Storage contracts and built-in store implementations for persisted session credentials.
//!
//! A [`CredentialStore`] is a small durable key/value map, the moral equivalent of a
//! browser's local storage. Only the session manager writes to it.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Stable storage keys used by the session layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StorageKey {
	/// Current access token.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Current refresh token.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// Legacy mirror of the access token.
	#[serde(rename = "token")]
	LegacyToken,
}
impl StorageKey {
	/// Every key the session layer owns, in purge order.
	pub const ALL: [StorageKey; 3] =
		[StorageKey::AccessToken, StorageKey::RefreshToken, StorageKey::LegacyToken];

	/// Returns the persisted key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			StorageKey::AccessToken => "accessToken",
			StorageKey::RefreshToken => "refreshToken",
			StorageKey::LegacyToken => "token",
		}
	}
}
impl Display for StorageKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single mutation applied by [`CredentialStore::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
	/// Insert or overwrite a value.
	Set(StorageKey, TokenSecret),
	/// Delete a value if present.
	Remove(StorageKey),
}

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn get(&self, key: StorageKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Applies every change atomically, in order.
	fn apply(&self, changes: Vec<StoreChange>) -> StoreFuture<'_, ()>;

	/// Inserts or overwrites a single value.
	fn set(&self, key: StorageKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		self.apply(vec![StoreChange::Set(key, value)])
	}

	/// Removes a single value.
	fn remove(&self, key: StorageKey) -> StoreFuture<'_, ()> {
		self.apply(vec![StoreChange::Remove(key)])
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

fn apply_to_map(map: &mut HashMap<StorageKey, TokenSecret>, changes: Vec<StoreChange>) {
	for change in changes {
		match change {
			StoreChange::Set(key, value) => {
				map.insert(key, value);
			},
			StoreChange::Remove(key) => {
				map.remove(&key);
			},
		}
	}
}
