//! Per-request response state and the render completion signal.
//!
//! An [`SsrResponse`] couples the mutable redirect/response payload with a
//! single-use [`Deferred`] completion channel. One instance is created per
//! render invocation and never reused; all mutation happens from within that
//! request's own asynchronous flow.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::SsrError;

/// Default status recorded by [`SsrResponse::redirect`] when the request has
/// not written one explicitly.
const REDIRECT_STATUS: u16 = 302;

/// Accumulated response metadata: status code, headers, and redirect target.
///
/// Built up incrementally through [`SsrResponse::write_response`] and
/// [`SsrResponse::redirect`]; returned to the caller either spread into the
/// render result or as the redirect response itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
	/// HTTP status code, when one was written.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Response headers.
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub headers: HashMap<String, String>,
	/// Redirect target, set only through [`SsrResponse::redirect`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
}

impl ResponsePayload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the status code.
	pub fn status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self
	}

	/// Adds a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	/// Merges `partial` into this payload. Later values win on collision.
	pub fn merge(&mut self, partial: ResponsePayload) {
		if partial.status.is_some() {
			self.status = partial.status;
		}
		self.headers.extend(partial.headers);
		if partial.location.is_some() {
			self.location = partial.location;
		}
	}
}

/// A single-use completion channel bridging the render chain to the
/// orchestrator.
///
/// Settling is idempotent by contract: the first `resolve`/`reject` wins and
/// every later settlement is absorbed as a no-op. This shields the pipeline
/// from a render engine firing its completion callback twice.
#[derive(Debug)]
pub struct Deferred {
	tx: Mutex<Option<oneshot::Sender<Result<String, SsrError>>>>,
	rx: Mutex<Option<oneshot::Receiver<Result<String, SsrError>>>>,
}

impl Deferred {
	/// Creates an unsettled channel.
	pub fn new() -> Self {
		let (tx, rx) = oneshot::channel();
		Self {
			tx: Mutex::new(Some(tx)),
			rx: Mutex::new(Some(rx)),
		}
	}

	/// Settles the channel with a rendered body. No-op if already settled.
	pub fn resolve(&self, body: String) {
		self.settle(Ok(body));
	}

	/// Settles the channel with a failure. No-op if already settled.
	pub fn reject(&self, err: SsrError) {
		self.settle(Err(err));
	}

	fn settle(&self, outcome: Result<String, SsrError>) {
		let sender = self
			.tx
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.take();
		match sender {
			Some(tx) => {
				// The receiver is owned by the same request, so send can only
				// fail if wait() was dropped mid-flight; nothing to do then.
				let _ = tx.send(outcome);
			}
			None => {
				tracing::warn!("completion signal settled more than once; ignoring");
			}
		}
	}

	/// Awaits the settlement. Intended to be awaited exactly once; a second
	/// wait fails with [`SsrError::Unsettled`].
	pub async fn wait(&self) -> Result<String, SsrError> {
		let receiver = self
			.rx
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.take();
		match receiver {
			Some(rx) => rx.await.unwrap_or(Err(SsrError::Unsettled)),
			None => Err(SsrError::Unsettled),
		}
	}
}

impl Default for Deferred {
	fn default() -> Self {
		Self::new()
	}
}

/// Response controller for one render invocation.
///
/// Holds the deferred completion signal together with the redirect flag and
/// the accumulated [`ResponsePayload`]. Consulted at three checkpoints: after
/// the pre-render hook, after the body render, and when assembling the final
/// result.
#[derive(Debug, Default)]
pub struct SsrResponse {
	redirected: AtomicBool,
	payload: Mutex<ResponsePayload>,
	deferred: Deferred,
}

impl SsrResponse {
	/// Creates a fresh controller. One per request; never pooled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Merges `partial` into the accumulated payload without short-circuiting
	/// the render.
	pub fn write_response(&self, partial: ResponsePayload) {
		self.payload
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.merge(partial);
	}

	/// Records that the request resolved to a redirect.
	///
	/// Sets the redirect flag, stores the target, and merges any extras into
	/// the payload. Calling it again overwrites the target: last write wins.
	/// A `302` status is recorded when none has been written.
	pub fn redirect(&self, location: impl Into<String>, extras: Option<ResponsePayload>) {
		let location = location.into();
		tracing::debug!(%location, "redirect recorded");
		let mut payload = self
			.payload
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner);
		if let Some(extras) = extras {
			payload.merge(extras);
		}
		payload.location = Some(location);
		if payload.status.is_none() {
			payload.status = Some(REDIRECT_STATUS);
		}
		self.redirected.store(true, Ordering::SeqCst);
	}

	/// Whether a redirect has been recorded.
	pub fn is_redirect(&self) -> bool {
		self.redirected.load(Ordering::SeqCst)
	}

	/// Snapshot of the accumulated payload.
	pub fn payload(&self) -> ResponsePayload {
		self.payload
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.clone()
	}

	/// The completion signal for this request.
	pub fn deferred(&self) -> &Deferred {
		&self.deferred
	}
}
