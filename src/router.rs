//! Request-scoped router adapter.
//!
//! The route table is declared once per handler; each request binds a fresh
//! [`RouterAdapter`] to its full path. The adapter resolves the active route
//! during the render pass and exposes it through
//! [`RouterAdapter::current_route`], which stays `None` when resolution never
//! ran (an early redirect, for instance).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::collector::PropsProvider;
use crate::context::SsrContext;
use crate::page::Page;

/// A path pattern with `{name}` parameter segments.
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
	Literal(String),
	Param(String),
}

impl PathPattern {
	/// Parses a pattern such as `/users/{id}/`.
	pub fn new(pattern: &str) -> Self {
		let segments = pattern
			.split('/')
			.filter(|s| !s.is_empty())
			.map(|s| {
				s.strip_prefix('{')
					.and_then(|s| s.strip_suffix('}'))
					.map(|name| Segment::Param(name.to_string()))
					.unwrap_or_else(|| Segment::Literal(s.to_string()))
			})
			.collect();
		Self {
			pattern: pattern.to_string(),
			segments,
		}
	}

	/// Returns the raw pattern string.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Matches a path, returning extracted parameters on success.
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
		if parts.len() != self.segments.len() {
			return None;
		}
		let mut params = HashMap::new();
		for (segment, part) in self.segments.iter().zip(&parts) {
			match segment {
				Segment::Literal(lit) if lit == part => {}
				Segment::Literal(_) => return None,
				Segment::Param(name) => {
					params.insert(name.clone(), (*part).to_string());
				}
			}
		}
		Some(params)
	}
}

/// Route-level metadata carried on a match.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
	/// State merged into the request's initial state after the body render.
	/// Applied with assignment semantics: later source wins on key collision.
	pub state: Option<Map<String, Value>>,
}

impl RouteMeta {
	/// Creates empty metadata.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the route-level state mapping.
	pub fn state(mut self, state: Map<String, Value>) -> Self {
		self.state = Some(state);
		self
	}
}

/// Factory producing the matched route's page.
pub type RouteComponent = Arc<dyn Fn(&RouteMatch) -> Page + Send + Sync>;

/// A single route definition.
#[derive(Clone)]
pub struct Route {
	pattern: PathPattern,
	name: Option<String>,
	meta: RouteMeta,
	props: Option<Value>,
	component: RouteComponent,
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("pattern", &self.pattern)
			.field("name", &self.name)
			.field("has_props", &self.props.is_some())
			.finish()
	}
}

impl Route {
	/// Creates a new route.
	pub fn new<F>(pattern: &str, component: F) -> Self
	where
		F: Fn(&RouteMatch) -> Page + Send + Sync + 'static,
	{
		Self {
			pattern: PathPattern::new(pattern),
			name: None,
			meta: RouteMeta::default(),
			props: None,
			component: Arc::new(component),
		}
	}

	/// Names the route.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Attaches metadata.
	pub fn meta(mut self, meta: RouteMeta) -> Self {
		self.meta = meta;
		self
	}

	/// Attaches static route props.
	pub fn props(mut self, props: Value) -> Self {
		self.props = Some(props);
		self
	}

	/// Returns the pattern.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}

/// The result of matching the request path against the route table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	/// The matched path (base-relative, without query or fragment).
	pub path: String,
	/// Extracted path parameters.
	pub params: HashMap<String, String>,
	/// Route name, when the route was named.
	pub name: Option<String>,
	/// Route-level metadata.
	pub meta: RouteMeta,
	/// Props for the matched component, per the configured props policy.
	pub props: Option<Value>,
}

/// Options controlling per-page prop computation.
#[derive(Debug, Clone)]
pub struct PagePropsOptions {
	/// Whether matched params and route props are passed to the page
	/// component as props.
	pub pass_to_page: bool,
}

impl Default for PagePropsOptions {
	fn default() -> Self {
		Self { pass_to_page: true }
	}
}

/// A request-scoped router bound to one full path.
///
/// Created fresh per render invocation; never shared across requests.
pub struct RouterAdapter {
	routes: Arc<Vec<Route>>,
	base: Option<String>,
	full_path: String,
	page_props: PagePropsOptions,
	props_provider: Arc<dyn PropsProvider>,
	current: Mutex<Option<RouteMatch>>,
}

impl std::fmt::Debug for RouterAdapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouterAdapter")
			.field("routes_count", &self.routes.len())
			.field("base", &self.base)
			.field("full_path", &self.full_path)
			.finish()
	}
}

impl RouterAdapter {
	/// Binds a router to the request's full path.
	pub fn bind(
		routes: Arc<Vec<Route>>,
		base: Option<String>,
		full_path: String,
		page_props: PagePropsOptions,
		props_provider: Arc<dyn PropsProvider>,
	) -> Self {
		Self {
			routes,
			base,
			full_path,
			page_props,
			props_provider,
			current: Mutex::new(None),
		}
	}

	/// The full path this adapter is bound to.
	pub fn full_path(&self) -> &str {
		&self.full_path
	}

	/// Resolves the active route for the bound path.
	///
	/// Async because route components may load lazily; the orchestrator
	/// awaits resolution before the element tree is built, so
	/// [`current_route`](Self::current_route) is reliable from the render
	/// pass onward. Returns the match, if any.
	pub async fn resolve(&self, ctx: &SsrContext) -> Option<RouteMatch> {
		let path = self.route_path();
		for route in self.routes.iter() {
			if let Some(params) = route.pattern.matches(&path) {
				let mut matched = RouteMatch {
					path: path.clone(),
					params,
					name: route.name.clone(),
					meta: route.meta.clone(),
					props: None,
				};
				if self.page_props.pass_to_page {
					matched.props = self
						.props_provider
						.page_props(ctx, &matched, route.props.as_ref());
				}
				tracing::debug!(pattern = route.pattern.as_str(), path = %path, "route resolved");
				let mut current = self
					.current
					.lock()
					.unwrap_or_else(std::sync::PoisonError::into_inner);
				*current = Some(matched.clone());
				return Some(matched);
			}
		}
		tracing::debug!(path = %path, "no route matched");
		None
	}

	/// Returns the resolved route, or `None` when resolution never ran or
	/// nothing matched.
	pub fn current_route(&self) -> Option<RouteMatch> {
		self.current
			.lock()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.clone()
	}

	/// Renders the resolved route's component, or [`Page::Empty`] when there
	/// is no match. Intended for use inside the application root component.
	pub fn outlet(&self) -> Page {
		let current = self.current_route();
		match current {
			Some(matched) => {
				let route = self
					.routes
					.iter()
					.find(|r| r.pattern.matches(&matched.path).is_some());
				match route {
					Some(route) => (route.component)(&matched),
					None => Page::Empty,
				}
			}
			None => Page::Empty,
		}
	}

	/// Strips base, query, and fragment from the bound full path.
	fn route_path(&self) -> String {
		let mut path = self.full_path.as_str();
		if let Some(base) = &self.base {
			path = path.strip_prefix(base.as_str()).unwrap_or(path);
		}
		let end = path.find(['?', '#']).unwrap_or(path.len());
		let path = &path[..end];
		if path.is_empty() {
			"/".to_string()
		} else {
			path.to_string()
		}
	}
}
