//! Bearer-authenticated HTTP request relay—declarative endpoint descriptions,
//! single-flight token refresh, and a closed failure taxonomy in one crate built
//! for backend-backed apps.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod coalescer;
pub mod decode;
pub mod error;
pub mod obs;
pub mod pipeline;
pub mod request;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience fixtures for unit and integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use crate::{
		auth::OauthToken,
		decode::{JsonDecoder, ResponseDecoder},
		request::{ApiRequest, Method, PreparedRequest},
		transport::{Transport, TransportFailure, TransportFuture, TransportResponse},
	};

	/// Scripted transport that replays queued replies and records every prepared
	/// request it receives.
	///
	/// Construct with [`ScriptedTransport::gated`] to hold replies back until the
	/// test releases them, which keeps an execution observably in flight.
	#[derive(Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<Result<TransportResponse, TransportFailure>>>,
		sent: Mutex<Vec<PreparedRequest>>,
		gate: Option<Semaphore>,
	}
	impl ScriptedTransport {
		/// Creates an ungated transport that replies immediately.
		pub fn new() -> Self {
			Self::default()
		}

		/// Creates a transport whose replies block until [`release`](Self::release) is called.
		pub fn gated() -> Self {
			Self { gate: Some(Semaphore::new(0)), ..Self::default() }
		}

		/// Queues a reply with the provided status code and body.
		pub fn push_ok(&self, status: u16, body: impl Into<Vec<u8>>) {
			self.push_raw(Some(status), body);
		}

		/// Queues a reply, allowing the status to be absent (non-HTTP response).
		pub fn push_raw(&self, status: Option<u16>, body: impl Into<Vec<u8>>) {
			self.replies.lock().push_back(Ok(TransportResponse { status, body: body.into() }));
		}

		/// Queues a transport-level failure.
		pub fn push_failure(&self, failure: TransportFailure) {
			self.replies.lock().push_back(Err(failure));
		}

		/// Releases `permits` held replies on a gated transport.
		pub fn release(&self, permits: usize) {
			if let Some(gate) = &self.gate {
				gate.add_permits(permits);
			}
		}

		/// Number of requests that reached the transport.
		pub fn calls(&self) -> usize {
			self.sent.lock().len()
		}

		/// Snapshot of every request sent so far.
		pub fn sent(&self) -> Vec<PreparedRequest> {
			self.sent.lock().clone()
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
			self.sent.lock().push(request);

			Box::pin(async move {
				if let Some(gate) = &self.gate {
					let permit =
						gate.acquire().await.expect("Scripted transport gate was closed.");

					permit.forget();
				}

				self.replies.lock().pop_front().unwrap_or_else(|| {
					Ok(TransportResponse { status: Some(200), body: b"{}".to_vec() })
				})
			})
		}
	}

	/// Token endpoint description used by auth manager tests.
	pub struct TokenEndpoint;
	impl ApiRequest for TokenEndpoint {
		type Response = OauthToken;

		fn method(&self) -> Method {
			Method::Post
		}

		fn host(&self) -> String {
			"auth.example.com".into()
		}

		fn path(&self) -> String {
			"/oauth/token".into()
		}

		fn decoder(&self) -> Box<dyn ResponseDecoder<Self::Response>> {
			Box::new(JsonDecoder::new())
		}
	}

	/// JSON body a token endpoint would return for the provided credential.
	pub fn token_response(access_token: &str, expires_in: i64) -> String {
		format!(
			"{{\"access_token\":\"{access_token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}"
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use futures::{
		FutureExt,
		future::{BoxFuture, Shared},
	};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result, SourceError};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
