//! Grappelli - Server-Side Render Orchestration
//!
//! Renders a component-tree application to an HTML string on the server,
//! producing the markup, head tags, and serialized initial state a client
//! needs to resume the same application without a full re-render.
//!
//! The crate does not implement routing, component rendering, or bundling;
//! it sequences calls to those collaborators and manages the data flowing
//! between them. Each collaborator is consumed through a narrow interface:
//!
//! - [`collector::Renderer`]: the string-producing renderer strategy
//! - [`router`]: a request-scoped adapter over a declarative route table
//! - [`page::Head`]: document metadata extracted from the element tree
//! - [`HTML_PLACEHOLDER`]: the token the build pipeline replaces
//!
//! ## Pipeline
//!
//! A handler built by [`create_handler`] drives each request through one
//! deterministic cycle: normalize the URL, run the optional pre-render hook
//! (which may redirect or seed initial state), resolve the route, build the
//! wrapped element tree, sweep it with an async prepass for data loads,
//! render the body, re-check for redirects, merge route-level state, extract
//! head metadata and styles, and serialize the initial state.
//!
//! ## Example
//!
//! ```ignore
//! use grappelli::{Page, PageElement, Route, SsrContext, SsrOptions, create_handler};
//!
//! fn app(ctx: &SsrContext) -> Page {
//!     PageElement::new("div")
//!         .attr("id", "app")
//!         .child(ctx.router().outlet())
//!         .into_page()
//! }
//!
//! let handler = create_handler(
//!     app,
//!     SsrOptions::new().routes(vec![Route::new("/", |_| Page::text("Home"))]),
//!     None,
//! );
//! let outcome = handler.handle("/", Default::default()).await?;
//! ```

#![warn(missing_docs)]

pub mod collector;
pub mod context;
pub mod error;
pub mod handler;
pub mod options;
pub mod page;
pub mod response;
pub mod route;
pub mod router;
pub mod state;

pub use collector::{
	DefaultPropsProvider, DefaultStateTransformer, NoopVisitor, PrepassVisitor, PropsProvider,
	Renderer, StateTransformer, StyleCollector, StyleCollectorFactory, TreeRenderer, prepass,
};
pub use context::{RequestExtras, SsrContext, use_context};
pub use error::{BoxError, SsrError};
pub use handler::{
	HTML_PLACEHOLDER, Hook, RenderOutcome, RenderResult, RootComponent, SsrHandler, create_handler,
};
pub use options::{BaseFn, SsrOptions};
pub use page::{Head, IntoPage, LinkTag, MetaTag, Page, PageElement, ScriptTag, StyleTag};
pub use response::{Deferred, ResponsePayload, SsrResponse};
pub use route::{create_url, get_full_path, without_suffix};
pub use router::{PagePropsOptions, PathPattern, Route, RouteMatch, RouteMeta, RouterAdapter};
pub use state::serialize_state;
