//! Closed failure taxonomy shared by the request pipeline and the auth manager.
//!
//! Every failure a caller can observe is one of the eleven [`Error`] variants, each
//! carrying the URL it originated from plus variant-specific context. Nothing in the
//! relay surfaces an untyped error across this boundary.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Cloneable wrapper around an underlying failure raised by a dependency.
///
/// Sources are held behind [`Arc`] so taxonomy values stay [`Clone`]: every caller
/// coalesced onto a single execution receives the same error. Two sources compare
/// equal when their display strings match, not by identity.
#[derive(Clone, Debug)]
pub struct SourceError(Arc<dyn StdError + Send + Sync>);
impl SourceError {
	/// Wraps an arbitrary failure.
	pub fn new(source: impl 'static + Send + Sync + StdError) -> Self {
		Self(Arc::new(source))
	}

	/// Builds a source from a plain message, for failures that arrive without a
	/// typed error (e.g. a caught panic payload).
	pub fn msg(message: impl Into<String>) -> Self {
		Self(Arc::new(Message(message.into())))
	}
}
impl Display for SourceError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}
impl StdError for SourceError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		Some(&*self.0 as &(dyn StdError + 'static))
	}
}
impl PartialEq for SourceError {
	fn eq(&self, other: &Self) -> bool {
		self.0.to_string() == other.0.to_string()
	}
}

#[derive(Debug)]
struct Message(String);
impl Display for Message {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}
impl StdError for Message {}

/// Canonical relay error exposed by [`load`](crate::pipeline::RequestManager::load)
/// and [`token`](crate::auth::AuthManager::token).
///
/// The set is closed by design; consumers match exhaustively instead of probing an
/// open error hierarchy. Each variant carries the URL of the offending request so
/// errors can be logged and branched on without extra context.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Components could not be combined into a well-formed URL.
	#[error("Failed to build a URL from scheme `{scheme:?}`, host `{host}`, path `{path}`.")]
	InvalidUrl {
		/// Scheme component, when one was supplied.
		scheme: Option<String>,
		/// Host component.
		host: String,
		/// Path component.
		path: String,
		/// Query parameters, keys unique.
		queries: BTreeMap<String, String>,
	},
	/// Transport exceeded its deadline.
	#[error("Request to `{url}` timed out.")]
	Timeout {
		/// Resolved request URL.
		url: String,
	},
	/// No connectivity at the transport layer.
	#[error("No network connection while requesting `{url}`.")]
	NoNetwork {
		/// Resolved request URL.
		url: String,
	},
	/// Any other transport-level failure.
	#[error("Transport error while requesting `{url}`: {source}.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: SourceError,
		/// Resolved request URL.
		url: String,
	},
	/// Request body serialization failed.
	#[error("Failed to encode the request body for `{url}`: {source}.")]
	Encoding {
		/// Underlying serialization failure.
		#[source]
		source: SourceError,
		/// Resolved request URL.
		url: String,
	},
	/// Response body deserialization failed.
	#[error("Failed to decode the response from `{url}`: {source}.")]
	Decoding {
		/// Underlying deserialization failure.
		#[source]
		source: SourceError,
		/// Raw response body, when one was received.
		body: Option<Vec<u8>>,
		/// Resolved request URL.
		url: String,
	},
	/// The backend answered with HTTP 401.
	#[error("Request to `{url}` was not authenticated (401).")]
	Unauthenticated {
		/// Resolved request URL.
		url: String,
	},
	/// The backend answered with HTTP 403.
	#[error("Request to `{url}` was rejected as restricted (403).")]
	Restricted {
		/// Resolved request URL.
		url: String,
	},
	/// The backend answered with a 4xx status other than 401/403.
	#[error("Request to `{url}` failed with client status {code}: {}.", String::from_utf8_lossy(body))]
	Client {
		/// HTTP status code.
		code: u16,
		/// Raw response body.
		body: Vec<u8>,
		/// Resolved request URL.
		url: String,
	},
	/// The backend answered with a 5xx status.
	#[error("Request to `{url}` failed with server status {code}: {}.", String::from_utf8_lossy(body))]
	Server {
		/// HTTP status code.
		code: u16,
		/// Raw response body.
		body: Vec<u8>,
		/// Resolved request URL.
		url: String,
	},
	/// A dependency raised an error of a type the pipeline did not anticipate.
	#[error("Uncaught error from {origin} (expected {expected}) for `{url}`: {source}.")]
	Uncaught {
		/// Underlying failure.
		#[source]
		source: SourceError,
		/// Pipeline step that caught the failure.
		origin: &'static str,
		/// Error type the step expected to see.
		expected: &'static str,
		/// Resolved request URL.
		url: String,
	},
}
impl Error {
	/// Stable numeric tag identifying the variant across process boundaries.
	pub fn code(&self) -> u16 {
		match self {
			Self::InvalidUrl { .. } => 7000,
			Self::Timeout { .. } => 7001,
			Self::NoNetwork { .. } => 7002,
			Self::Transport { .. } => 7003,
			Self::Encoding { .. } => 7004,
			Self::Decoding { .. } => 7005,
			Self::Unauthenticated { .. } => 7006,
			Self::Restricted { .. } => 7007,
			Self::Client { .. } => 7008,
			Self::Server { .. } => 7009,
			Self::Uncaught { .. } => 7010,
		}
	}

	/// Canonical URL context carried by the variant.
	///
	/// [`Error::InvalidUrl`] never resolved a URL, so a best-effort string is
	/// assembled from its components for diagnostics.
	pub fn url(&self) -> String {
		match self {
			Self::InvalidUrl { scheme, host, path, queries } =>
				debug_url_from(scheme.as_deref(), host, path, queries),
			Self::Timeout { url }
			| Self::NoNetwork { url }
			| Self::Transport { url, .. }
			| Self::Encoding { url, .. }
			| Self::Decoding { url, .. }
			| Self::Unauthenticated { url }
			| Self::Restricted { url }
			| Self::Client { url, .. }
			| Self::Server { url, .. }
			| Self::Uncaught { url, .. } => url.clone(),
		}
	}

	/// Path component of the context URL, when it parses.
	pub fn path(&self) -> Option<String> {
		Url::parse(&self.url()).ok().map(|url| url.path().to_owned())
	}
}
impl PartialEq for Error {
	fn eq(&self, other: &Self) -> bool {
		// Bail out early; the URL is the primary equality key for every variant.
		if self.url() != other.url() {
			return false;
		}

		match (self, other) {
			(Self::InvalidUrl { queries: l, .. }, Self::InvalidUrl { queries: r, .. }) => l == r,
			(Self::Timeout { .. }, Self::Timeout { .. })
			| (Self::NoNetwork { .. }, Self::NoNetwork { .. })
			| (Self::Unauthenticated { .. }, Self::Unauthenticated { .. })
			| (Self::Restricted { .. }, Self::Restricted { .. }) => true,
			(Self::Transport { source: l, .. }, Self::Transport { source: r, .. })
			| (Self::Encoding { source: l, .. }, Self::Encoding { source: r, .. }) => l == r,
			(
				Self::Decoding { source: ls, body: lb, .. },
				Self::Decoding { source: rs, body: rb, .. },
			) => ls == rs && lb == rb,
			(
				Self::Client { code: lc, body: lb, .. },
				Self::Client { code: rc, body: rb, .. },
			)
			| (
				Self::Server { code: lc, body: lb, .. },
				Self::Server { code: rc, body: rb, .. },
			) => lc == rc && lb == rb,
			(
				Self::Uncaught { source: ls, origin: lo, expected: le, .. },
				Self::Uncaught { source: rs, origin: ro, expected: re, .. },
			) => ls == rs && lo == ro && le == re,
			_ => false,
		}
	}
}

/// Crude URL assembly used only for diagnostics on [`Error::InvalidUrl`].
fn debug_url_from(
	scheme: Option<&str>,
	host: &str,
	path: &str,
	queries: &BTreeMap<String, String>,
) -> String {
	let mut result = String::new();

	if let Some(scheme) = scheme {
		result.push_str(scheme);

		if !scheme.ends_with("://") {
			result.push_str("://");
		}
	}

	result.push_str(host.strip_prefix("://").unwrap_or(host));

	if !path.is_empty() && !result.ends_with('/') && !path.starts_with('/') {
		result.push('/');
	}

	result.push_str(path);

	if !queries.is_empty() {
		result.push('?');
		result.push_str(
			&queries.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&"),
		);
	}

	result
}
