//! Tracing hooks for pipeline loads and token fetches (enabled via the `tracing`
//! feature).

// self
use crate::_prelude::*;

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRelay<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRelay<F> = F;

/// Span builder wrapped around the relay's asynchronous sections.
#[derive(Clone, Debug)]
pub struct RelaySpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RelaySpan {
	/// Creates a span covering one pipeline load.
	pub fn load(method: &'static str, url: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_relay.load", method, url);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, url);

			Self {}
		}
	}

	/// Creates a span covering one coalesced token fetch.
	pub fn token_fetch() -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_relay.token_fetch");

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRelay<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			fut
		}
	}
}
