//! The render orchestrator.
//!
//! [`create_handler`] binds an application root component, configuration,
//! and an optional pre-render hook into an [`SsrHandler`]. Each call to
//! [`SsrHandler::handle`] drives one request through the pipeline:
//!
//! ```text
//! Init -> HookRun -> (Redirected | PrePassRendering)
//!      -> (Redirected | BodyReady) -> Finalizing -> Done
//! ```
//!
//! Every asynchronous step is a sequential suspension point on one logical
//! task; the deferred completion signal collapses the renderer's internal
//! microtask chain into a single observed "body ready" event. At most one of
//! {render result, redirect response} is produced per request.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::collector::{StyleGuard, prepass};
use crate::context::{RequestExtras, SsrContext, with_render_scope};
use crate::error::{BoxError, SsrError};
use crate::options::SsrOptions;
use crate::page::Page;
use crate::response::{ResponsePayload, SsrResponse};
use crate::route::{create_url, get_full_path, without_suffix};
use crate::router::{Route, RouterAdapter};

/// Placeholder token the build pipeline replaces with the full HTML template.
pub const HTML_PLACEHOLDER: &str = "__SSR_HTML__";

/// The application root component.
///
/// Receives the request context and produces the element tree. Closures of
/// the matching shape implement this automatically.
pub trait RootComponent: Send + Sync + 'static {
	/// Builds the application's element tree for this request.
	fn render(&self, ctx: &SsrContext) -> Page;
}

impl<F> RootComponent for F
where
	F: Fn(&SsrContext) -> Page + Send + Sync + 'static,
{
	fn render(&self, ctx: &SsrContext) -> Page {
		self(ctx)
	}
}

/// Optional pre-render hook.
///
/// Awaited before the render pass with the request context. A returned
/// mapping becomes the new initial state; calling
/// [`SsrContext::redirect`] short-circuits the request. Errors propagate to
/// the caller unwrapped.
pub type Hook = Arc<
	dyn Fn(Arc<SsrContext>) -> BoxFuture<'static, Result<Option<Map<String, Value>>, BoxError>>
		+ Send
		+ Sync,
>;

/// A completed render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderResult {
	/// [`HTML_PLACEHOLDER`], replaced at build time.
	pub html: String,
	/// Attribute string for the `<html>` element.
	pub html_attrs: String,
	/// Head tags followed by collected style tags.
	pub head_tags: String,
	/// The rendered body markup.
	pub body: String,
	/// Attribute string for the `<body>` element.
	pub body_attrs: String,
	/// Serialized initial state, ready to inline in a script context.
	pub initial_state: String,
	/// Module dependencies. Always empty: this renderer does not populate a
	/// manifest context.
	pub dependencies: Vec<String>,
	/// Response metadata accumulated through `write_response`.
	#[serde(flatten)]
	pub response: ResponsePayload,
}

/// Outcome of one request: a render or a redirect, never both.
#[derive(Debug)]
pub enum RenderOutcome {
	/// The request rendered to markup.
	Rendered(RenderResult),
	/// The request resolved to a redirect; the payload carries at minimum
	/// the target location.
	Redirect(ResponsePayload),
}

impl RenderOutcome {
	/// Whether this outcome is a redirect.
	pub fn is_redirect(&self) -> bool {
		matches!(self, Self::Redirect(_))
	}

	/// Returns the render result, if the request rendered.
	pub fn rendered(self) -> Option<RenderResult> {
		match self {
			Self::Rendered(result) => Some(result),
			Self::Redirect(_) => None,
		}
	}
}

/// Binds an application, configuration, and optional hook into a request
/// handler.
pub fn create_handler(
	app: impl RootComponent,
	options: SsrOptions,
	hook: Option<Hook>,
) -> SsrHandler {
	let mut options = options;
	let routes = Arc::new(std::mem::take(&mut options.routes));
	SsrHandler {
		app: Arc::new(app),
		routes,
		options,
		hook,
	}
}

/// The per-application request handler. Cheap to share; all per-request
/// state lives in fresh [`SsrContext`]/[`SsrResponse`] instances.
pub struct SsrHandler {
	app: Arc<dyn RootComponent>,
	routes: Arc<Vec<Route>>,
	options: SsrOptions,
	hook: Option<Hook>,
}

impl std::fmt::Debug for SsrHandler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SsrHandler")
			.field("routes_count", &self.routes.len())
			.field("has_hook", &self.hook.is_some())
			.finish()
	}
}

impl SsrHandler {
	/// Renders one request.
	///
	/// Any failure from the hook, prepass, renderer, style collector, or
	/// state transform propagates as an error; there are no internal retries.
	pub async fn handle(
		&self,
		raw_url: &str,
		extras: RequestExtras,
	) -> Result<RenderOutcome, SsrError> {
		// Init
		let url = create_url(raw_url)?;
		let route_base = self.options.base.as_ref().map(|base| {
			let raw = base(&url);
			without_suffix(&raw, "/").to_string()
		});
		let full_path = get_full_path(&url, route_base.as_deref());
		let response = Arc::new(SsrResponse::new());
		let router = Arc::new(RouterAdapter::bind(
			Arc::clone(&self.routes),
			route_base,
			full_path.clone(),
			self.options.page_props.clone(),
			Arc::clone(&self.options.props_provider),
		));
		let ctx = Arc::new(SsrContext::new(url, router, Arc::clone(&response), extras));
		tracing::debug!(path = %full_path, "render started");

		// HookRun
		if let Some(hook) = &self.hook {
			if let Some(state) = hook(Arc::clone(&ctx)).await.map_err(SsrError::Hook)? {
				ctx.set_initial_state(state);
			}
		}
		if response.is_redirect() {
			tracing::debug!("short-circuited by hook redirect");
			return Ok(RenderOutcome::Redirect(response.payload()));
		}

		// The remaining phases run inside the render scope so descendant
		// components and visitors can reach the context ambiently.
		with_render_scope(Arc::clone(&ctx), self.render_request(&ctx, &response)).await
	}

	/// PrePassRendering through Done.
	async fn render_request(
		&self,
		ctx: &Arc<SsrContext>,
		response: &Arc<SsrResponse>,
	) -> Result<RenderOutcome, SsrError> {
		// Resolve the active route before the element tree is built.
		ctx.router().resolve(ctx).await;

		let mut app = self.app.render(ctx);

		let styles = match &self.options.style_collector {
			Some(factory) => {
				let collector = factory(Arc::clone(ctx)).await?;
				Some(StyleGuard::new(collector))
			}
			None => None,
		};
		if let Some(styles) = &styles {
			app = styles.collect(app);
		}

		// Prepass and render funnel into the deferred signal; the
		// orchestrator observes settlement exactly once.
		let rendered = async {
			prepass(&app, self.options.prepass_visitor.as_ref(), ctx).await?;
			self.options.renderer.render_to_string(&app).await
		}
		.await;
		let deferred = response.deferred();
		match rendered {
			Ok(body) => deferred.resolve(body),
			Err(err) => deferred.reject(err),
		}
		// On rejection the style guard drops here and releases the collector.
		let body = deferred.wait().await?;

		// BodyReady: a component may have redirected during prepass/render.
		if response.is_redirect() {
			tracing::debug!("redirected during render pass");
			if let Some(styles) = &styles {
				styles.release();
			}
			return Ok(RenderOutcome::Redirect(response.payload()));
		}

		// Finalizing
		if let Some(matched) = ctx.router().current_route() {
			if let Some(state) = &matched.meta.state {
				ctx.merge_initial_state(state);
			}
		}

		let head = app.find_topmost_head().cloned().unwrap_or_default();
		let style_tags = styles
			.as_ref()
			.map(|s| s.to_style_string(&body))
			.unwrap_or_default();
		if let Some(styles) = &styles {
			styles.release();
		}

		let mut head_tags = head.to_tags_string();
		head_tags.push('\n');
		head_tags.push_str(&style_tags);

		let initial_state = self
			.options
			.transform_state
			.transform(&ctx.initial_state())
			.await?;

		tracing::debug!(body_len = body.len(), "render finished");
		Ok(RenderOutcome::Rendered(RenderResult {
			html: HTML_PLACEHOLDER.to_string(),
			html_attrs: head.html_attrs_string(),
			head_tags,
			body,
			body_attrs: head.body_attrs_string(),
			initial_state,
			dependencies: Vec::new(),
			response: response.payload(),
		}))
	}
}
