//! Handler configuration.

use std::sync::Arc;

use url::Url;

use crate::collector::{
	DefaultPropsProvider, DefaultStateTransformer, NoopVisitor, PrepassVisitor, PropsProvider,
	Renderer, StateTransformer, StyleCollectorFactory, TreeRenderer,
};
use crate::router::{PagePropsOptions, Route};

/// Computes a base path prefix from the request URL.
pub type BaseFn = Arc<dyn Fn(&Url) -> String + Send + Sync>;

/// Configuration for [`create_handler`](crate::handler::create_handler).
///
/// Every strategy has a default; the builder methods swap individual
/// concerns without affecting the orchestrator's control flow. All choices
/// are fixed at construction time.
#[derive(Clone)]
pub struct SsrOptions {
	pub(crate) routes: Vec<Route>,
	pub(crate) base: Option<BaseFn>,
	pub(crate) prepass_visitor: Arc<dyn PrepassVisitor>,
	pub(crate) props_provider: Arc<dyn PropsProvider>,
	pub(crate) page_props: PagePropsOptions,
	pub(crate) style_collector: Option<StyleCollectorFactory>,
	pub(crate) transform_state: Arc<dyn StateTransformer>,
	pub(crate) renderer: Arc<dyn Renderer>,
}

impl std::fmt::Debug for SsrOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SsrOptions")
			.field("routes_count", &self.routes.len())
			.field("has_base", &self.base.is_some())
			.field("has_style_collector", &self.style_collector.is_some())
			.field("page_props", &self.page_props)
			.finish()
	}
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			routes: Vec::new(),
			base: None,
			prepass_visitor: Arc::new(NoopVisitor),
			props_provider: Arc::new(DefaultPropsProvider),
			page_props: PagePropsOptions::default(),
			style_collector: None,
			transform_state: Arc::new(DefaultStateTransformer),
			renderer: Arc::new(TreeRenderer),
		}
	}
}

impl SsrOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the route table.
	pub fn routes(mut self, routes: Vec<Route>) -> Self {
		self.routes = routes;
		self
	}

	/// Sets the base-path function. Its result is normalized by stripping a
	/// trailing `/` before use.
	pub fn base<F>(mut self, base: F) -> Self
	where
		F: Fn(&Url) -> String + Send + Sync + 'static,
	{
		self.base = Some(Arc::new(base));
		self
	}

	/// Sets the prepass visitor.
	pub fn prepass_visitor(mut self, visitor: impl PrepassVisitor + 'static) -> Self {
		self.prepass_visitor = Arc::new(visitor);
		self
	}

	/// Sets the props provider.
	pub fn props_provider(mut self, provider: impl PropsProvider + 'static) -> Self {
		self.props_provider = Arc::new(provider);
		self
	}

	/// Sets the per-page props options.
	pub fn page_props(mut self, options: PagePropsOptions) -> Self {
		self.page_props = options;
		self
	}

	/// Sets the per-request style collector factory.
	pub fn style_collector(mut self, factory: StyleCollectorFactory) -> Self {
		self.style_collector = Some(factory);
		self
	}

	/// Sets the state transformer. Defaults to the single-quoted literal
	/// serializer.
	pub fn transform_state(mut self, transformer: impl StateTransformer + 'static) -> Self {
		self.transform_state = Arc::new(transformer);
		self
	}

	/// Selects the renderer strategy.
	pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
		self.renderer = Arc::new(renderer);
		self
	}
}
