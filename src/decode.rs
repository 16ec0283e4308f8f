//! Response decoding capability consumed by the request pipeline.

// std
use std::marker::PhantomData;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Decodes raw response bytes into a typed value.
///
/// Implementations are supplied per request description; the pipeline wraps any
/// failure into [`Error::Decoding`](crate::error::Error::Decoding) together with the
/// raw body and the resolved URL.
pub trait ResponseDecoder<T>
where
	Self: Send + Sync,
{
	/// Decodes `bytes` into the bound response type.
	fn decode(&self, bytes: &[u8]) -> Result<T, SourceError>;
}

/// JSON decoder used by the vast majority of endpoint descriptions.
///
/// Failures are routed through `serde_path_to_error` so a decode error names the
/// offending JSON path instead of just a byte offset.
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);
impl<T> JsonDecoder<T> {
	/// Creates the decoder.
	pub fn new() -> Self {
		Self(PhantomData)
	}
}
impl<T> Default for JsonDecoder<T> {
	fn default() -> Self {
		Self::new()
	}
}
impl<T> ResponseDecoder<T> for JsonDecoder<T>
where
	T: DeserializeOwned,
{
	fn decode(&self, bytes: &[u8]) -> Result<T, SourceError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(SourceError::new)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, PartialEq, Deserialize)]
	struct Payload {
		name: String,
	}

	#[test]
	fn json_decoder_produces_typed_values() {
		let decoder = JsonDecoder::<Payload>::new();

		assert_eq!(
			decoder.decode(b"{\"name\":\"scout\"}").expect("Decode should succeed."),
			Payload { name: "scout".into() },
		);
	}

	#[test]
	fn json_decoder_names_the_failing_path() {
		let decoder = JsonDecoder::<Payload>::new();
		let error = decoder.decode(b"{\"name\":7}").expect_err("Decode should fail.");

		assert!(error.to_string().contains("name"));
	}
}
