// self
use crate::{_prelude::*, auth::TokenSecret};

/// Single-flight guard for refresh exchanges.
///
/// Callers snapshot [`RefreshGate::generation`] before waiting on [`RefreshGate::lock`].
/// Once inside, a generation that moved on means another caller finished an exchange while
/// this one waited, and its outcome is reused instead of starting a second exchange.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	in_flight: AsyncMutex<()>,
	settled: Mutex<Settled>,
}
impl RefreshGate {
	pub(crate) fn generation(&self) -> u64 {
		self.settled.lock().generation
	}

	pub(crate) async fn lock(&self) -> async_lock::MutexGuard<'_, ()> {
		self.in_flight.lock().await
	}

	/// Outcome of the most recent exchange, if one settled after `observed`.
	///
	/// Must be called while holding the lock.
	pub(crate) fn settled_since(&self, observed: u64) -> Option<Option<TokenSecret>> {
		let settled = self.settled.lock();

		(settled.generation != observed).then(|| settled.outcome.clone())
	}

	/// Publishes the outcome of an exchange. Must be called while holding the lock.
	pub(crate) fn settle(&self, outcome: Option<TokenSecret>) {
		let mut settled = self.settled.lock();

		settled.generation = settled.generation.wrapping_add(1);
		settled.outcome = outcome;
	}
}

#[derive(Debug, Default)]
struct Settled {
	generation: u64,
	outcome: Option<TokenSecret>,
}
