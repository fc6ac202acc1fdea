//! Pluggable capability interfaces for the render pipeline.
//!
//! Each concern the orchestrator delegates — producing the body markup,
//! sweeping the tree for data loads, collecting styles, transforming state,
//! computing page props — is a small trait that can be swapped through
//! [`SsrOptions`](crate::options::SsrOptions) without touching the
//! orchestrator's control flow.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::context::SsrContext;
use crate::error::SsrError;
use crate::page::{Page, PageElement};
use crate::router::RouteMatch;
use crate::state::serialize_state;

/// Strategy producing the body markup from the element tree.
///
/// Selected once at handler construction; there is no runtime toggling, so
/// the first request cannot race an alternate renderer still loading.
#[async_trait]
pub trait Renderer: Send + Sync {
	/// Renders the tree to an HTML string.
	async fn render_to_string(&self, page: &Page) -> Result<String, SsrError>;
}

/// Default renderer: a synchronous walk over the page tree.
#[derive(Debug, Default)]
pub struct TreeRenderer;

#[async_trait]
impl Renderer for TreeRenderer {
	async fn render_to_string(&self, page: &Page) -> Result<String, SsrError> {
		Ok(page.render_to_string())
	}
}

/// Visitor invoked on every element during the prepass sweep.
///
/// Runs before the final render so components can trigger data loads; the
/// visitor typically reads the ambient context, fetches, and writes results
/// into the initial state.
#[async_trait]
pub trait PrepassVisitor: Send + Sync {
	/// Visits one element.
	async fn visit(&self, element: &PageElement, ctx: &SsrContext) -> Result<(), SsrError>;
}

/// Visitor that does nothing.
#[derive(Debug, Default)]
pub struct NoopVisitor;

#[async_trait]
impl PrepassVisitor for NoopVisitor {
	async fn visit(&self, _element: &PageElement, _ctx: &SsrContext) -> Result<(), SsrError> {
		Ok(())
	}
}

/// Sweeps the tree depth-first, awaiting the visitor on each element.
pub async fn prepass(
	page: &Page,
	visitor: &dyn PrepassVisitor,
	ctx: &SsrContext,
) -> Result<(), SsrError> {
	let mut stack = vec![page];
	while let Some(node) = stack.pop() {
		match node {
			Page::Element(el) => {
				visitor.visit(el, ctx).await?;
				stack.extend(el.child_pages());
			}
			Page::Fragment(children) => stack.extend(children),
			Page::Text(_) | Page::Empty => {}
		}
	}
	Ok(())
}

/// Per-request style collection.
///
/// Created by a [`StyleCollectorFactory`] at the start of the render pass;
/// wraps the tree so styled components register their CSS, then serializes
/// everything relevant to the rendered body.
pub trait StyleCollector: Send + Sync {
	/// Wraps the element tree to observe styled components.
	fn collect(&self, page: Page) -> Page;

	/// Serializes the collected styles for the rendered body.
	fn to_style_string(&self, body: &str) -> String;

	/// Releases collector resources. Called exactly once per request by the
	/// pipeline's guard, on redirect and success paths alike.
	fn cleanup(&self) {}
}

/// Async factory producing one [`StyleCollector`] per request.
pub type StyleCollectorFactory = Arc<
	dyn Fn(Arc<SsrContext>) -> BoxFuture<'static, Result<Arc<dyn StyleCollector>, SsrError>>
		+ Send
		+ Sync,
>;

/// Wraps a collector so release is idempotent.
///
/// Dropping the guard also releases, so error propagation cannot leak
/// collector resources; the flag guarantees cleanup still runs only once.
pub(crate) struct StyleGuard {
	collector: Arc<dyn StyleCollector>,
	released: AtomicBool,
}

impl StyleGuard {
	pub(crate) fn new(collector: Arc<dyn StyleCollector>) -> Self {
		Self {
			collector,
			released: AtomicBool::new(false),
		}
	}

	pub(crate) fn collect(&self, page: Page) -> Page {
		self.collector.collect(page)
	}

	pub(crate) fn to_style_string(&self, body: &str) -> String {
		self.collector.to_style_string(body)
	}

	pub(crate) fn release(&self) {
		if !self.released.swap(true, Ordering::SeqCst) {
			self.collector.cleanup();
		}
	}
}

impl Drop for StyleGuard {
	fn drop(&mut self) {
		self.release();
	}
}

/// Transforms the final initial state into its embeddable string form.
#[async_trait]
pub trait StateTransformer: Send + Sync {
	/// Produces the script-safe literal for `state`.
	async fn transform(&self, state: &Map<String, Value>) -> Result<String, SsrError>;
}

/// Default transformer: [`serialize_state`].
#[derive(Debug, Default)]
pub struct DefaultStateTransformer;

#[async_trait]
impl StateTransformer for DefaultStateTransformer {
	async fn transform(&self, state: &Map<String, Value>) -> Result<String, SsrError> {
		serialize_state(&Value::Object(state.clone()))
	}
}

/// Computes the props handed to the matched route's component.
pub trait PropsProvider: Send + Sync {
	/// Returns the props for `matched`, given any static route props.
	fn page_props(
		&self,
		ctx: &SsrContext,
		matched: &RouteMatch,
		route_props: Option<&Value>,
	) -> Option<Value>;
}

/// Default policy: path params merged with static route props, route props
/// winning on key collision.
#[derive(Debug, Default)]
pub struct DefaultPropsProvider;

impl PropsProvider for DefaultPropsProvider {
	fn page_props(
		&self,
		_ctx: &SsrContext,
		matched: &RouteMatch,
		route_props: Option<&Value>,
	) -> Option<Value> {
		let mut props = Map::new();
		for (key, value) in &matched.params {
			props.insert(key.clone(), Value::String(value.clone()));
		}
		if let Some(Value::Object(statics)) = route_props {
			for (key, value) in statics {
				props.insert(key.clone(), value.clone());
			}
		}
		if props.is_empty() {
			None
		} else {
			Some(Value::Object(props))
		}
	}
}
