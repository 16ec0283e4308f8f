//! Declarative request descriptions and their preparation for transport.
//!
//! Endpoint layers describe a call as an [`ApiRequest`]—method, host, path,
//! queries, headers, optional body, and a decoder for the response type—and
//! [`prepare`] resolves that description plus an optional bearer token into a
//! [`PreparedRequest`] ready for a [`Transport`](crate::transport::Transport).

// std
use std::panic::{self, AssertUnwindSafe};
// self
use crate::{_prelude::*, decode::ResponseDecoder};

/// HTTP method of a request description.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
	/// HTTP GET.
	#[default]
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Wire representation of the method.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}

/// Declarative description of one backend call.
///
/// Most endpoints only override a couple of members; the defaults cover a plain
/// unauthenticated GET with no queries, headers, or body. Descriptions are
/// immutable values constructed by the application's endpoint layer and consumed
/// per call.
pub trait ApiRequest {
	/// Decoded response type.
	type Response;

	/// Host component, possibly including a port.
	fn host(&self) -> String;

	/// Path component.
	fn path(&self) -> String;

	/// Decoder bound to [`Self::Response`].
	fn decoder(&self) -> Box<dyn ResponseDecoder<Self::Response>>;

	/// HTTP method; GET unless overridden.
	fn method(&self) -> Method {
		Method::Get
	}

	/// Scheme component; the relay falls back to `https` when absent.
	fn scheme(&self) -> Option<String> {
		None
	}

	/// Query parameters, keys unique.
	fn queries(&self) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Additional request headers.
	fn headers(&self) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Whether the call must carry a bearer token.
	fn requires_auth(&self) -> bool {
		false
	}

	/// Optional request body with its content type.
	fn body(&self) -> Option<RequestBody> {
		None
	}
}

/// Serializable request payload together with its content type.
///
/// The payload is an opaque capability: [`RequestBody::json`] covers the common
/// case, and the pipeline treats serialization as fallible regardless of origin.
#[derive(Clone)]
pub struct RequestBody {
	content_type: &'static str,
	payload: Arc<dyn ErasedBody>,
}
impl RequestBody {
	/// Wraps a JSON-serializable payload.
	pub fn json<T>(payload: T) -> Self
	where
		T: 'static + Send + Sync + Serialize,
	{
		Self { content_type: "application/json", payload: Arc::new(JsonBody(payload)) }
	}

	/// Declared content type of the payload.
	pub fn content_type(&self) -> &'static str {
		self.content_type
	}

	pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, SourceError> {
		self.payload.to_bytes()
	}
}
impl Debug for RequestBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestBody").field("content_type", &self.content_type).finish()
	}
}

trait ErasedBody
where
	Self: Send + Sync,
{
	fn to_bytes(&self) -> Result<Vec<u8>, SourceError>;
}

struct JsonBody<T>(T);
impl<T> ErasedBody for JsonBody<T>
where
	T: Send + Sync + Serialize,
{
	fn to_bytes(&self) -> Result<Vec<u8>, SourceError> {
		serde_json::to_vec(&self.0).map_err(SourceError::new)
	}
}

/// Request description resolved into concrete method, URL, headers, and body,
/// ready for transport. `url` doubles as the canonical error context.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute resolved URL.
	pub url: Url,
	/// Assembled headers, including `Authorization` and `Content-Type` when set.
	pub headers: BTreeMap<String, String>,
	/// Serialized body bytes, when the description carries a body.
	pub body: Option<Vec<u8>>,
}

/// Resolves a description plus an optional bearer token into a [`PreparedRequest`].
///
/// Failure mapping, step by step: URL assembly →
/// [`Error::InvalidUrl`], body serialization → [`Error::Encoding`], and a panic
/// escaping the body capability → [`Error::Uncaught`] tagged with the step that
/// caught it. Header assembly itself cannot fail.
pub fn prepare<R>(request: &R, auth_token: Option<&str>) -> Result<PreparedRequest>
where
	R: ?Sized + ApiRequest,
{
	let scheme = request.scheme();
	let host = request.host();
	let path = request.path();
	let queries = request.queries();
	let invalid_url = || Error::InvalidUrl {
		scheme: scheme.clone(),
		host: host.clone(),
		path: path.clone(),
		queries: queries.clone(),
	};
	// An empty host must be rejected before assembly: `https:///v1/x` parses by
	// promoting the first path segment to the host.
	if host.is_empty() {
		return Err(invalid_url());
	}

	let raw = format!(
		"{}://{}{}{}",
		scheme.as_deref().unwrap_or("https"),
		host,
		if path.is_empty() || path.starts_with('/') { "" } else { "/" },
		path,
	);
	let mut url = Url::parse(&raw).map_err(|_| invalid_url())?;

	if url.host_str().is_none_or(str::is_empty) {
		return Err(invalid_url());
	}
	if !queries.is_empty() {
		url.query_pairs_mut().extend_pairs(&queries);
	}

	let mut headers = request.headers();

	if let Some(token) = auth_token {
		headers.insert("Authorization".into(), token.into());
	}

	let body = match request.body() {
		Some(body) => {
			headers.insert("Content-Type".into(), body.content_type().into());

			Some(encode_body(&body, url.as_str())?)
		},
		None => None,
	};

	Ok(PreparedRequest { method: request.method(), url, headers, body })
}

/// Serializes the body, keeping the public error surface closed.
///
/// The body capability is pluggable, so its failure modes are not fully known in
/// advance: a typed serialization failure maps to [`Error::Encoding`], while a
/// panic escaping the capability is caught and wrapped as [`Error::Uncaught`]
/// instead of unwinding through the pipeline.
fn encode_body(body: &RequestBody, url: &str) -> Result<Vec<u8>> {
	match panic::catch_unwind(AssertUnwindSafe(|| body.to_bytes())) {
		Ok(Ok(bytes)) => Ok(bytes),
		Ok(Err(source)) => Err(Error::Encoding { source, url: url.to_owned() }),
		Err(payload) => {
			let message = payload
				.downcast_ref::<&str>()
				.map(|s| (*s).to_owned())
				.or_else(|| payload.downcast_ref::<String>().cloned())
				.unwrap_or_else(|| "non-string panic payload".to_owned());

			Err(Error::Uncaught {
				source: SourceError::msg(message),
				origin: "Request body encoding",
				expected: "serde_json::Error",
				url: url.to_owned(),
			})
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::decode::JsonDecoder;

	struct Fixture {
		scheme: Option<String>,
		host: String,
		path: String,
		queries: BTreeMap<String, String>,
		headers: BTreeMap<String, String>,
		body: Option<RequestBody>,
	}
	impl Default for Fixture {
		fn default() -> Self {
			Self {
				scheme: Some("https".into()),
				host: "example.com".into(),
				path: "/v1/x".into(),
				queries: BTreeMap::new(),
				headers: BTreeMap::new(),
				body: None,
			}
		}
	}
	impl ApiRequest for Fixture {
		type Response = serde_json::Value;

		fn host(&self) -> String {
			self.host.clone()
		}

		fn path(&self) -> String {
			self.path.clone()
		}

		fn decoder(&self) -> Box<dyn ResponseDecoder<Self::Response>> {
			Box::new(JsonDecoder::new())
		}

		fn scheme(&self) -> Option<String> {
			self.scheme.clone()
		}

		fn queries(&self) -> BTreeMap<String, String> {
			self.queries.clone()
		}

		fn headers(&self) -> BTreeMap<String, String> {
			self.headers.clone()
		}

		fn body(&self) -> Option<RequestBody> {
			self.body.clone()
		}
	}

	#[test]
	fn url_round_trips_components() {
		let fixture = Fixture {
			queries: [("a".to_owned(), "1".to_owned())].into_iter().collect(),
			..Fixture::default()
		};
		let prepared = prepare(&fixture, None).expect("Preparation should succeed.");

		assert_eq!(prepared.url.as_str(), "https://example.com/v1/x?a=1");
		assert_eq!(prepared.method, Method::Get);
	}

	#[test]
	fn malformed_host_yields_invalid_url() {
		let fixture = Fixture { host: "exa mple.com".into(), ..Fixture::default() };
		let error = prepare(&fixture, None).expect_err("Preparation should fail.");

		assert!(matches!(
			&error,
			Error::InvalidUrl { host, .. } if host == "exa mple.com",
		));
	}

	#[test]
	fn empty_host_yields_invalid_url() {
		let fixture = Fixture { host: String::new(), ..Fixture::default() };

		// Must fail before URL assembly; `https:///v1/x` would otherwise parse
		// with `v1` promoted to the host.
		assert!(matches!(
			prepare(&fixture, None).expect_err("Preparation should fail."),
			Error::InvalidUrl { host, path, .. } if host.is_empty() && path == "/v1/x",
		));
	}

	#[test]
	fn scheme_defaults_to_https() {
		let fixture = Fixture { scheme: None, ..Fixture::default() };
		let prepared = prepare(&fixture, None).expect("Preparation should succeed.");

		assert_eq!(prepared.url.scheme(), "https");
	}

	#[test]
	fn auth_and_content_type_headers_are_assembled() {
		let fixture = Fixture {
			headers: [("X-Relay".to_owned(), "1".to_owned())].into_iter().collect(),
			body: Some(RequestBody::json(serde_json::json!({ "name": "scout" }))),
			..Fixture::default()
		};
		let prepared =
			prepare(&fixture, Some("Bearer abc")).expect("Preparation should succeed.");

		assert_eq!(prepared.headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
		assert_eq!(
			prepared.headers.get("Content-Type").map(String::as_str),
			Some("application/json"),
		);
		assert_eq!(prepared.headers.get("X-Relay").map(String::as_str), Some("1"));
		assert_eq!(prepared.body.as_deref(), Some(&b"{\"name\":\"scout\"}"[..]));
	}

	#[test]
	fn missing_token_omits_the_auth_header() {
		let prepared =
			prepare(&Fixture::default(), None).expect("Preparation should succeed.");

		assert!(!prepared.headers.contains_key("Authorization"));
		assert!(!prepared.headers.contains_key("Content-Type"));
		assert_eq!(prepared.body, None);
	}

	#[test]
	fn panicking_body_capability_is_wrapped_as_uncaught() {
		struct Exploding;
		impl Serialize for Exploding {
			fn serialize<S>(&self, _: S) -> Result<S::Ok, S::Error>
			where
				S: serde::Serializer,
			{
				panic!("boom");
			}
		}

		let fixture =
			Fixture { body: Some(RequestBody::json(Exploding)), ..Fixture::default() };
		let error = prepare(&fixture, None).expect_err("Preparation should fail.");

		assert!(matches!(
			&error,
			Error::Uncaught { origin, .. } if *origin == "Request body encoding",
		));
	}
}
