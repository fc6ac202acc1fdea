//! Error types for the render pipeline.

/// Boxed error type for failures originating in caller-supplied code
/// (hooks, renderers, style collectors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the render pipeline.
///
/// Failures from caller-supplied collaborators are carried as sources and
/// propagated without retries; the caller decides how to map them to a
/// transport-level response.
#[derive(Debug, thiserror::Error)]
pub enum SsrError {
	/// The request URL could not be parsed, even against the synthetic origin.
	#[error("invalid url `{raw}`: {source}")]
	InvalidUrl {
		/// The raw input that failed to parse.
		raw: String,
		/// The underlying parse failure.
		#[source]
		source: url::ParseError,
	},

	/// The pre-render hook failed. The original error is the source.
	#[error("pre-render hook failed: {0}")]
	Hook(#[source] BoxError),

	/// The prepass sweep or the renderer failed.
	#[error("render failed: {0}")]
	Render(#[source] BoxError),

	/// The style collector failed during creation or serialization.
	#[error("style collector failed: {0}")]
	StyleCollector(#[source] BoxError),

	/// Initial state could not be serialized.
	#[error("state serialization failed: {0}")]
	State(#[from] serde_json::Error),

	/// An ambient context accessor was invoked outside an active render scope.
	#[error("no active render scope")]
	OutsideRender,

	/// The completion channel closed without ever being settled, or was
	/// awaited more than once.
	#[error("render completion channel closed without settling")]
	Unsettled,
}

impl SsrError {
	/// Wraps a renderer/prepass failure.
	pub fn render(err: impl Into<BoxError>) -> Self {
		Self::Render(err.into())
	}

	/// Wraps a style collector failure.
	pub fn style(err: impl Into<BoxError>) -> Self {
		Self::StyleCollector(err.into())
	}

	/// Wraps a pre-render hook failure.
	pub fn hook(err: impl Into<BoxError>) -> Self {
		Self::Hook(err.into())
	}
}
