//! Transport capability consumed by the request pipeline.
//!
//! The relay depends on nothing beyond the [`Transport`] contract: send a prepared
//! request, come back with a status + body or a [`TransportFailure`]. A
//! reqwest-backed implementation ships behind the default `reqwest` feature;
//! anything else (test doubles included) plugs in the same way.

// self
use crate::{_prelude::*, request::PreparedRequest};
#[cfg(feature = "reqwest")] use crate::request::Method;

/// Transport-layer failure, before the pipeline attaches a URL to it.
#[derive(Debug, ThisError)]
pub enum TransportFailure {
	/// No connectivity at all.
	#[error("Transport reported no network connection.")]
	NotConnected,
	/// The transport's deadline elapsed.
	#[error("Transport timed out.")]
	TimedOut,
	/// Any other transport failure.
	#[error("Transport failed: {0}.")]
	Other(#[source] SourceError),
}

/// Raw outcome of one transport round trip.
///
/// `status` is `None` when the response carried no recognizable HTTP status (e.g.
/// a non-HTTP response); the pipeline passes such bodies straight to decoding,
/// since a missing status is not itself evidence of failure.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code, when one was recognizable.
	pub status: Option<u16>,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportFailure>> + 'a + Send>>;

/// Black-box capability that executes one prepared request.
///
/// Exactly one round trip per call; retries, timeouts, and backoff are the
/// transport's own business (or nobody's), never the relay's.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends the prepared request and resolves with the raw outcome.
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] implementing [`Transport`].
///
/// Supply a pre-configured client via [`with_client`](Self::with_client) to control
/// timeouts, proxies, or TLS settings; the relay itself imposes none.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(reqwest_method(request.method), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(map_reqwest_error)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

			Ok(TransportResponse { status: Some(status), body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(error: reqwest::Error) -> TransportFailure {
	if error.is_timeout() {
		TransportFailure::TimedOut
	} else if error.is_connect() {
		TransportFailure::NotConnected
	} else {
		TransportFailure::Other(SourceError::new(error))
	}
}
