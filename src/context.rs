//! Request-scoped context and the ambient accessor.
//!
//! One [`SsrContext`] exists per render invocation. It is handed directly to
//! the pre-render hook and made available to descendant components through a
//! task-local render scope: [`use_context`] reads it from anywhere inside the
//! active render and fails with [`SsrError::OutsideRender`] everywhere else.
//! The task-local follows the task across thread boundaries in work-stealing
//! runtimes, so no cross-request state can leak.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use url::Url;

use crate::error::SsrError;
use crate::response::{ResponsePayload, SsrResponse};
use crate::router::RouterAdapter;

/// Caller-supplied per-request extras.
///
/// `manifest` and `preload` are carried through untouched for the build
/// pipeline; arbitrary fields ride along for application code.
#[derive(Debug, Clone, Default)]
pub struct RequestExtras {
	/// Build manifest, passed through unused by this core.
	pub manifest: Option<Value>,
	/// Preload flag, passed through unused by this core.
	pub preload: bool,
	/// Arbitrary caller fields.
	pub fields: HashMap<String, Value>,
}

/// The per-request bag shared with the hook and the component tree.
///
/// Owned exclusively by one render invocation; a fresh instance is mandatory
/// per call.
pub struct SsrContext {
	url: Url,
	initial_state: Mutex<Map<String, Value>>,
	router: Arc<RouterAdapter>,
	response: Arc<SsrResponse>,
	extras: RequestExtras,
}

impl std::fmt::Debug for SsrContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SsrContext")
			.field("url", &self.url.as_str())
			.field("is_client", &self.is_client())
			.finish()
	}
}

impl SsrContext {
	/// Creates a context for one request.
	pub fn new(
		url: Url,
		router: Arc<RouterAdapter>,
		response: Arc<SsrResponse>,
		extras: RequestExtras,
	) -> Self {
		Self {
			url,
			initial_state: Mutex::new(Map::new()),
			router,
			response,
			extras,
		}
	}

	/// The normalized request URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Always false server-side.
	pub fn is_client(&self) -> bool {
		false
	}

	/// The request-scoped router.
	pub fn router(&self) -> &Arc<RouterAdapter> {
		&self.router
	}

	/// The response controller.
	pub fn response(&self) -> &Arc<SsrResponse> {
		&self.response
	}

	/// The caller-supplied extras.
	pub fn extras(&self) -> &RequestExtras {
		&self.extras
	}

	/// Records a redirect on the response controller.
	pub fn redirect(&self, location: impl Into<String>, extras: Option<ResponsePayload>) {
		self.response.redirect(location, extras);
	}

	/// Merges response metadata without short-circuiting the render.
	pub fn write_response(&self, partial: ResponsePayload) {
		self.response.write_response(partial);
	}

	/// Snapshot of the current initial state.
	pub fn initial_state(&self) -> Map<String, Value> {
		self.initial_state
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.clone()
	}

	/// Replaces the initial state wholesale (hook return value).
	pub fn set_initial_state(&self, state: Map<String, Value>) {
		*self
			.initial_state
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner) = state;
	}

	/// Merges a mapping into the initial state with assignment semantics:
	/// the incoming source wins on key collision.
	pub fn merge_initial_state(&self, state: &Map<String, Value>) {
		let mut current = self
			.initial_state
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner);
		for (key, value) in state {
			current.insert(key.clone(), value.clone());
		}
	}

	/// Inserts a single initial-state entry.
	pub fn insert_state(&self, key: impl Into<String>, value: Value) {
		self.initial_state
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.insert(key.into(), value);
	}
}

tokio::task_local! {
	/// The context of the render currently executing on this task.
	static RENDER_CONTEXT: Arc<SsrContext>;
}

/// Runs `f` inside a render scope that exposes `ctx` through [`use_context`].
pub(crate) async fn with_render_scope<F, T>(ctx: Arc<SsrContext>, f: F) -> T
where
	F: Future<Output = T>,
{
	RENDER_CONTEXT.scope(ctx, f).await
}

/// Reads the ambient request context.
///
/// Usable from component code and prepass visitors during an active render.
/// Fails with [`SsrError::OutsideRender`] when no render is executing on the
/// current task, rather than ever returning stale or cross-request data.
pub fn use_context() -> Result<Arc<SsrContext>, SsrError> {
	RENDER_CONTEXT
		.try_with(Arc::clone)
		.map_err(|_| SsrError::OutsideRender)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collector::DefaultPropsProvider;
	use crate::router::PagePropsOptions;
	use serde_json::json;

	fn test_context() -> Arc<SsrContext> {
		let url = crate::route::create_url("/").unwrap();
		let router = Arc::new(RouterAdapter::bind(
			Arc::new(Vec::new()),
			None,
			"/".to_string(),
			PagePropsOptions::default(),
			Arc::new(DefaultPropsProvider),
		));
		Arc::new(SsrContext::new(
			url,
			router,
			Arc::new(SsrResponse::new()),
			RequestExtras::default(),
		))
	}

	#[test]
	fn test_use_context_outside_render_fails() {
		assert!(matches!(use_context(), Err(SsrError::OutsideRender)));
	}

	#[tokio::test]
	async fn test_use_context_inside_scope() {
		let ctx = test_context();
		let url = with_render_scope(Arc::clone(&ctx), async {
			use_context().unwrap().url().path().to_string()
		})
		.await;
		assert_eq!(url, "/");
	}

	#[tokio::test]
	async fn test_use_context_after_scope_fails() {
		let ctx = test_context();
		with_render_scope(ctx, async {}).await;
		assert!(matches!(use_context(), Err(SsrError::OutsideRender)));
	}

	#[test]
	fn test_initial_state_merge_assignment_semantics() {
		let ctx = test_context();
		ctx.insert_state("a", json!(1));
		ctx.insert_state("b", json!("hook"));

		let mut route_state = Map::new();
		route_state.insert("b".to_string(), json!("route"));
		route_state.insert("c".to_string(), json!(3));
		ctx.merge_initial_state(&route_state);

		let state = ctx.initial_state();
		assert_eq!(state.get("a"), Some(&json!(1)));
		assert_eq!(state.get("b"), Some(&json!("route")));
		assert_eq!(state.get("c"), Some(&json!(3)));
	}

	#[test]
	fn test_set_initial_state_replaces() {
		let ctx = test_context();
		ctx.insert_state("old", json!(true));
		let mut fresh = Map::new();
		fresh.insert("new".to_string(), json!(false));
		ctx.set_initial_state(fresh);
		let state = ctx.initial_state();
		assert!(!state.contains_key("old"));
		assert!(state.contains_key("new"));
	}

	#[test]
	fn test_redirect_via_context() {
		let ctx = test_context();
		assert!(!ctx.response().is_redirect());
		ctx.redirect("/login", None);
		assert!(ctx.response().is_redirect());
	}
}
