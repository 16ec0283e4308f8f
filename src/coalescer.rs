//! Single-flight execution of a shared asynchronous operation.
//!
//! [`Coalesced`] wraps a zero-argument asynchronous producer so that any number of
//! concurrent callers share one underlying execution: the first caller starts it,
//! later callers attach to it, and every waiter receives the same result. The
//! wrapper adds nothing else—no retry, no timeout, no backoff.

// std
use std::panic;
// crates.io
use tokio::task::JoinHandle;
// self
use crate::_prelude::*;

type Producer<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type InFlight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Single-flight executor for one logical operation.
///
/// Created once per operation (e.g. one per [`AuthManager`](crate::auth::AuthManager)
/// instance) and driven through [`execute`](Self::execute) for the lifetime of its
/// owner. The in-flight slot transitions idle → running → idle indefinitely.
pub struct Coalesced<T, E> {
	producer: Producer<T, E>,
	in_flight: Arc<Mutex<Option<InFlight<T, E>>>>,
}
impl<T, E> Coalesced<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	/// Wraps a producer of `Result<T, E>`.
	pub fn new<F, Fut>(producer: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T, E>>,
	{
		Self {
			producer: Arc::new(move || producer().boxed()),
			in_flight: Arc::new(Mutex::new(None)),
		}
	}

	/// Runs the wrapped producer, or attaches to the execution already running.
	///
	/// At most one execution exists at any instant. The slot returns to idle as the
	/// last act of the execution itself, before any waiter observes the value, so a
	/// caller arriving right after completion starts a fresh execution instead of
	/// reusing the finished one. Callers that arrive while the producer is in
	/// flight never trigger a second execution and never observe a result other
	/// than the one the in-flight execution produces.
	///
	/// The execution runs on a spawned Tokio task (callers must be inside a
	/// runtime): dropping one caller's wait does not cancel the producer for the
	/// remaining waiters, and no caller that reaches the await is left without a
	/// result.
	pub async fn execute(&self) -> Result<T, E> {
		let shared = {
			let mut slot = self.in_flight.lock();

			match slot.as_ref() {
				Some(running) => running.clone(),
				None => {
					let fut = (self.producer)();
					let in_flight = self.in_flight.clone();
					let handle = tokio::spawn(async move {
						let value = fut.await;

						// Idle again before the value is published to any waiter.
						*in_flight.lock() = None;

						value
					});
					let shared = join(handle).boxed().shared();

					*slot = Some(shared.clone());

					shared
				},
			}
		};

		shared.await
	}
}

/// Flattens a [`JoinHandle`], resuming producer panics on the waiting caller.
async fn join<T, E>(handle: JoinHandle<Result<T, E>>) -> Result<T, E> {
	match handle.await {
		Ok(value) => value,
		Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
		// The handle is never aborted; this arm is only reachable while the
		// runtime itself is shutting down.
		Err(e) => panic!("Coalesced execution was cancelled: {e}."),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;

	fn counting(
		runs: Arc<AtomicUsize>,
		gate: Arc<Semaphore>,
	) -> Coalesced<usize, &'static str> {
		Coalesced::new(move || {
			let runs = runs.clone();
			let gate = gate.clone();

			async move {
				let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
				let permit = gate.acquire().await.expect("Test gate was closed.");

				permit.forget();

				Ok(run)
			}
		})
	}

	#[test]
	fn execution_future_can_cross_threads() {
		fn assert_send(_: &impl Send) {}

		let coalesced = Coalesced::<usize, &'static str>::new(|| async { Ok(1) });

		// Spawning the execution onto a multi-threaded runtime requires the
		// future (and the shared slot it captures) to be `Send`.
		assert_send(&coalesced.execute());
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_execution() {
		let runs = Arc::new(AtomicUsize::new(0));
		let gate = Arc::new(Semaphore::new(0));
		let coalesced = Arc::new(counting(runs.clone(), gate.clone()));
		let waiters = (0..4)
			.map(|_| {
				let coalesced = coalesced.clone();

				tokio::spawn(async move { coalesced.execute().await })
			})
			.collect::<Vec<_>>();

		// Let every waiter attach before the producer is allowed to finish.
		for _ in 0..8 {
			tokio::task::yield_now().await;
		}

		gate.add_permits(1);

		for waiter in waiters {
			assert_eq!(waiter.await.expect("Waiter task failed."), Ok(1));
		}

		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn completed_execution_returns_to_idle() {
		let runs = Arc::new(AtomicUsize::new(0));
		let gate = Arc::new(Semaphore::new(2));
		let coalesced = counting(runs.clone(), gate);

		assert_eq!(coalesced.execute().await, Ok(1));
		// The slot was cleared before the first value was returned, so a caller
		// arriving now triggers a fresh execution rather than reusing the
		// just-completed result. This window is part of the contract.
		assert_eq!(coalesced.execute().await, Ok(2));
		assert_eq!(runs.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn errors_are_shared_with_every_waiter() {
		let coalesced =
			Arc::new(Coalesced::<usize, &'static str>::new(|| async { Err("unavailable") }));
		let a = {
			let coalesced = coalesced.clone();

			tokio::spawn(async move { coalesced.execute().await })
		};
		let b = coalesced.execute().await;

		assert_eq!(a.await.expect("Waiter task failed."), Err("unavailable"));
		assert_eq!(b, Err("unavailable"));
	}

	#[tokio::test]
	async fn dropped_waiter_does_not_cancel_the_execution() {
		let runs = Arc::new(AtomicUsize::new(0));
		let gate = Arc::new(Semaphore::new(0));
		let coalesced = Arc::new(counting(runs.clone(), gate.clone()));
		let abandoned = {
			let coalesced = coalesced.clone();

			tokio::spawn(async move { coalesced.execute().await })
		};

		for _ in 0..8 {
			tokio::task::yield_now().await;
		}

		let survivor = {
			let coalesced = coalesced.clone();

			tokio::spawn(async move { coalesced.execute().await })
		};

		for _ in 0..8 {
			tokio::task::yield_now().await;
		}

		abandoned.abort();
		gate.add_permits(1);

		assert_eq!(survivor.await.expect("Surviving waiter failed."), Ok(1));
		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}
}
