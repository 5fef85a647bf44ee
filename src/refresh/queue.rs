//! FIFO of callers parked on the in-flight refresh operation.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::CredentialPair, error::RefreshError};

/// Outcome delivered to every caller parked on one refresh operation.
pub type RefreshOutcome = std::result::Result<CredentialPair, RefreshError>;

/// One parked caller: its ticket and the continuation that resumes it.
#[derive(Debug)]
pub struct PendingCaller {
	ticket: u64,
	continuation: oneshot::Sender<RefreshOutcome>,
}
impl PendingCaller {
	/// Ticket assigned when the caller joined.
	pub fn ticket(&self) -> u64 {
		self.ticket
	}
}

/// Ordered waiters for a single refresh operation.
///
/// Each caller is enqueued once and resumed once; [`PendingQueue::release`] consumes the queue,
/// so a second release is impossible by construction.
#[derive(Debug, Default)]
pub struct PendingQueue {
	waiters: VecDeque<PendingCaller>,
}
impl PendingQueue {
	/// Parks a caller and returns the receiver it awaits.
	pub fn enqueue(&mut self, ticket: u64) -> oneshot::Receiver<RefreshOutcome> {
		let (continuation, receiver) = oneshot::channel();

		self.waiters.push_back(PendingCaller { ticket, continuation });

		receiver
	}

	/// Number of parked callers.
	pub fn len(&self) -> usize {
		self.waiters.len()
	}

	/// Returns `true` when nobody is parked.
	pub fn is_empty(&self) -> bool {
		self.waiters.is_empty()
	}

	/// Resumes every caller in arrival order with a clone of `outcome`.
	///
	/// Returns the tickets that were delivered, in delivery order. Callers that stopped
	/// waiting are skipped silently.
	pub fn release(self, outcome: &RefreshOutcome) -> Vec<u64> {
		let mut delivered = Vec::with_capacity(self.waiters.len());

		for caller in self.waiters {
			if caller.continuation.send(outcome.clone()).is_ok() {
				delivered.push(caller.ticket);
			}
		}

		delivered
	}
}
