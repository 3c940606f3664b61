//! In-process access token cache keyed by the caller-ordered scope list.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeList, TokenStatus},
	error::TokenParseError,
};

type Entries = RwLock<HashMap<String, AccessToken>>;

/// Thread-safe map from cache key to the last token obtained for it.
///
/// Entries are only ever replaced by a newer token; a failed refresh leaves the previous entry in
/// place. Per-key guards let callers serialize refreshes when they opt into single-flight mode.
#[derive(Debug, Default)]
pub struct TokenCache {
	entries: Entries,
	flow_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}
impl TokenCache {
	/// Cache key for a scope list: the scopes joined by a single space, in caller order.
	pub fn key(scopes: &ScopeList) -> String {
		scopes.joined()
	}

	/// Returns the cached token for `key` if it is still fresh at `now`.
	///
	/// A stale or missing entry yields `Ok(None)`. An entry whose `exp` claim cannot be read
	/// yields an error and is left untouched.
	pub fn fresh_at(
		&self,
		key: &str,
		now: OffsetDateTime,
	) -> Result<Option<AccessToken>, TokenParseError> {
		let Some(token) = self.get(key) else {
			return Ok(None);
		};

		match token.status_at(now)? {
			TokenStatus::Fresh => Ok(Some(token)),
			TokenStatus::Stale => Ok(None),
		}
	}

	/// Returns the raw cached entry regardless of freshness.
	pub fn get(&self, key: &str) -> Option<AccessToken> {
		self.entries.read().get(key).cloned()
	}

	/// Inserts or replaces the entry for `key`.
	pub fn store(&self, key: impl Into<String>, token: AccessToken) {
		self.entries.write().insert(key.into(), token);
	}

	/// Returns (and creates on demand) the refresh guard for `key`.
	pub fn flow_guard(&self, key: &str) -> Arc<Mutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
	}

	/// Drops the guard for `key` once no other caller holds or waits on it.
	pub fn release_flow_guard(&self, key: &str, guard: Arc<Mutex<()>>) {
		let mut guards = self.flow_guards.lock();

		// One reference is the map's, the other is `guard`.
		if Arc::strong_count(&guard) == 2
			&& guards.get(key).is_some_and(|current| Arc::ptr_eq(current, &guard))
		{
			guards.remove(key);
		}
	}

	/// Number of refresh guards currently tracked.
	pub fn flow_guard_count(&self) -> usize {
		self.flow_guards.lock().len()
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns true when nothing has been cached yet.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
