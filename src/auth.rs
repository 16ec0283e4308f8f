//! Token acquisition, caching, and single-flight refresh.

pub mod token;
pub use token::*;

// self
use crate::{
	_prelude::*,
	coalescer::Coalesced,
	obs::RelaySpan,
	pipeline::RequestManager,
	request::ApiRequest,
	transport::Transport,
};

/// Fetches, caches, and refreshes a bearer credential.
///
/// The cached token is the one piece of shared mutable state in the relay: any
/// caller reads it, and only the completion of a coalesced fetch writes it. The
/// [`Coalesced`] wrapper guarantees that concurrent callers never trigger more
/// than one token-fetch round trip at a time; all of them receive the result of
/// the fetch they attached to, and the cache is set to that same value.
pub struct AuthManager<T> {
	fetch: Coalesced<T, Error>,
	cached: Arc<RwLock<Option<T>>>,
}
impl<T> AuthManager<T>
where
	T: 'static + Clone + Send + Sync + BearerToken,
{
	/// Creates a manager that fetches tokens by loading `request` through the
	/// provided pipeline.
	///
	/// The token request itself is sent unauthenticated; it is the call that
	/// produces the credential everything else authenticates with.
	pub fn new<C, R>(manager: Arc<RequestManager<C>>, request: R) -> Self
	where
		C: Transport,
		R: 'static + Send + Sync + ApiRequest<Response = T>,
	{
		let cached = Arc::new(RwLock::new(None));
		let fetch = {
			let cached = cached.clone();
			let request = Arc::new(request);

			Coalesced::new(move || {
				let manager = manager.clone();
				let request = request.clone();
				let cached = cached.clone();
				let span = RelaySpan::token_fetch();

				span.instrument(async move {
					let token: T = manager.load(request.as_ref(), None).await?;

					// Every caller coalesced onto this fetch sees this exact
					// value, and the cache holds the same one. A failed fetch
					// skips this write, leaving any previous token usable.
					*cached.write() = Some(token.clone());

					Ok(token)
				})
			})
		};

		Self { fetch, cached }
	}

	/// Returns a usable token, fetching or refreshing at most once across all
	/// concurrent callers.
	///
	/// A cached, non-expired token is returned directly unless `force_refresh` is
	/// set—no coalescer invocation, no transport call. Otherwise the call
	/// delegates to the coalesced fetch and resolves with whatever that single
	/// execution produced. On failure the cache is left untouched and the error
	/// surfaces to every attached caller.
	pub async fn token(&self, force_refresh: bool) -> Result<T> {
		if !force_refresh {
			let cached = self.cached.read().clone();

			if let Some(token) = cached
				&& !token.is_expired()
			{
				return Ok(token);
			}
		}

		self.fetch.execute().await
	}

	/// Header-ready credential string; see [`token`](Self::token).
	pub async fn bearer(&self, force_refresh: bool) -> Result<String> {
		Ok(self.token(force_refresh).await?.token())
	}

	/// Snapshot of the currently cached token, without triggering a fetch.
	pub fn cached_token(&self) -> Option<T> {
		self.cached.read().clone()
	}
}
