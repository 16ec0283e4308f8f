//! Request execution pipeline: prepare, send, classify, decode.

// self
use crate::{
	_prelude::*,
	obs::RelaySpan,
	request::{ApiRequest, prepare},
	transport::{Transport, TransportFailure, TransportResponse},
};

/// Executes declarative request descriptions over a [`Transport`].
///
/// Stateless per call: each [`load`](Self::load) is exactly one transport round
/// trip, with every failure converted into the closed [`Error`] taxonomy. Callers
/// wanting retry semantics re-invoke `load` themselves.
#[derive(Clone, Debug)]
pub struct RequestManager<C>
where
	C: Transport,
{
	transport: Arc<C>,
}
impl<C> RequestManager<C>
where
	C: Transport,
{
	/// Creates a manager over the provided transport.
	pub fn new(transport: impl Into<Arc<C>>) -> Self {
		Self { transport: transport.into() }
	}

	/// Shared handle to the underlying transport.
	pub fn transport(&self) -> &Arc<C> {
		&self.transport
	}

	/// Builds, sends, classifies, and decodes one request.
	///
	/// `auth_token` is attached as the `Authorization` header when present; the
	/// auth layer decides whether a description needs one (see
	/// [`ApiRequest::requires_auth`]).
	pub async fn load<R>(&self, request: &R, auth_token: Option<&str>) -> Result<R::Response>
	where
		R: ?Sized + ApiRequest,
	{
		let prepared = prepare(request, auth_token)?;
		let url = prepared.url.to_string();
		let span = RelaySpan::load(prepared.method.as_str(), &url);
		let decoder = request.decoder();

		span.instrument(async move {
			let response =
				self.transport.send(prepared).await.map_err(|failure| match failure {
					TransportFailure::NotConnected => Error::NoNetwork { url: url.clone() },
					TransportFailure::TimedOut => Error::Timeout { url: url.clone() },
					TransportFailure::Other(source) => Error::Transport { source, url: url.clone() },
				})?;
			let body = classify(response, &url)?;

			match decoder.decode(&body) {
				Ok(value) => Ok(value),
				Err(source) => Err(Error::Decoding { source, body: Some(body), url }),
			}
		})
		.await
	}
}

/// Applies the status-classification table, returning the body for decoding.
fn classify(response: TransportResponse, url: &str) -> Result<Vec<u8>> {
	let TransportResponse { status, body } = response;
	// A response without a recognizable status is not itself evidence of failure;
	// if something is really wrong, decoding will surface it.
	let Some(code) = status else { return Ok(body) };

	match code {
		401 => Err(Error::Unauthenticated { url: url.to_owned() }),
		403 => Err(Error::Restricted { url: url.to_owned() }),
		400..=499 => Err(Error::Client { code, body, url: url.to_owned() }),
		500..=599 => Err(Error::Server { code, body, url: url.to_owned() }),
		_ => Ok(body),
	}
}
