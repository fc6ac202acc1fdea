//! End-to-end tests for the render orchestration pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use grappelli::{
	Head, Hook, HTML_PLACEHOLDER, IntoPage, Page, PageElement, PrepassVisitor, RenderOutcome,
	Renderer, RequestExtras, ResponsePayload, Route, RouteMeta, SsrContext, SsrError, SsrOptions,
	StyleCollector, create_handler,
};
use serde_json::{Map, json};

fn app(ctx: &SsrContext) -> Page {
	PageElement::new("div")
		.attr("id", "app")
		.child(ctx.router().outlet())
		.into_page()
}

fn home(_m: &grappelli::RouteMatch) -> Page {
	Page::text("Home")
}

fn state_hook(state: Map<String, serde_json::Value>) -> Hook {
	Arc::new(move |_ctx| {
		let state = state.clone();
		async move { Ok(Some(state)) }.boxed()
	})
}

struct CountingRenderer {
	calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for CountingRenderer {
	async fn render_to_string(&self, page: &Page) -> Result<String, SsrError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(page.render_to_string())
	}
}

struct CountingCollector {
	cleanups: Arc<AtomicUsize>,
	css: &'static str,
}

impl StyleCollector for CountingCollector {
	fn collect(&self, page: Page) -> Page {
		page
	}

	fn to_style_string(&self, _body: &str) -> String {
		format!("<style>{}</style>", self.css)
	}

	fn cleanup(&self) {
		self.cleanups.fetch_add(1, Ordering::SeqCst);
	}
}

fn counting_collector_options(
	cleanups: Arc<AtomicUsize>,
	css: &'static str,
) -> SsrOptions {
	SsrOptions::default().style_collector(Arc::new(move |_ctx| {
		let cleanups = Arc::clone(&cleanups);
		async move {
			Ok(Arc::new(CountingCollector { cleanups, css }) as Arc<dyn StyleCollector>)
		}
		.boxed()
	}))
}

#[tokio::test]
async fn test_hook_state_merges_with_route_meta_state() {
	let mut hook_state = Map::new();
	hook_state.insert("a".to_string(), json!(1));

	let mut meta_state = Map::new();
	meta_state.insert("b".to_string(), json!(2));
	let routes = vec![Route::new("/", home).meta(RouteMeta::new().state(meta_state))];

	let handler = create_handler(
		app,
		SsrOptions::default().routes(routes),
		Some(state_hook(hook_state)),
	);
	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.initial_state, r#"'{"a":1,"b":2}'"#);
}

#[tokio::test]
async fn test_route_state_wins_on_key_collision() {
	let mut hook_state = Map::new();
	hook_state.insert("shared".to_string(), json!("hook"));

	let mut meta_state = Map::new();
	meta_state.insert("shared".to_string(), json!("route"));
	let routes = vec![Route::new("/", home).meta(RouteMeta::new().state(meta_state))];

	let handler = create_handler(
		app,
		SsrOptions::default().routes(routes),
		Some(state_hook(hook_state)),
	);
	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.initial_state, r#"'{"shared":"route"}'"#);
}

#[tokio::test]
async fn test_hook_redirect_short_circuits_before_any_render_work() {
	let renders = Arc::new(AtomicUsize::new(0));
	let hook: Hook = Arc::new(|ctx| {
		async move {
			ctx.redirect("/login", Some(ResponsePayload::new().header("x-reason", "auth")));
			Ok(None)
		}
		.boxed()
	});
	let options = SsrOptions::default().renderer(CountingRenderer {
		calls: Arc::clone(&renders),
	});
	let handler = create_handler(app, options, Some(hook));

	let outcome = handler.handle("/private", RequestExtras::default()).await.unwrap();
	match outcome {
		RenderOutcome::Redirect(payload) => {
			assert_eq!(payload.location.as_deref(), Some("/login"));
			assert_eq!(payload.status, Some(302));
			assert_eq!(payload.headers.get("x-reason").map(String::as_str), Some("auth"));
		}
		RenderOutcome::Rendered(_) => panic!("expected redirect"),
	}
	assert_eq!(renders.load(Ordering::SeqCst), 0, "renderer must not run");
}

struct RedirectingVisitor;

#[async_trait]
impl PrepassVisitor for RedirectingVisitor {
	async fn visit(&self, _element: &PageElement, ctx: &SsrContext) -> Result<(), SsrError> {
		ctx.redirect("/elsewhere", None);
		Ok(())
	}
}

#[tokio::test]
async fn test_component_redirect_during_render_wins_and_releases_styles_once() {
	let cleanups = Arc::new(AtomicUsize::new(0));
	let options = counting_collector_options(Arc::clone(&cleanups), ".a{}")
		.prepass_visitor(RedirectingVisitor);
	let handler = create_handler(app, options, None);

	let outcome = handler.handle("/", RequestExtras::default()).await.unwrap();
	assert!(outcome.is_redirect());
	match outcome {
		RenderOutcome::Redirect(payload) => {
			assert_eq!(payload.location.as_deref(), Some("/elsewhere"));
		}
		RenderOutcome::Rendered(_) => panic!("expected redirect"),
	}
	assert_eq!(cleanups.load(Ordering::SeqCst), 1, "cleanup must run exactly once");
}

struct DoubleSettlingRenderer;

#[async_trait]
impl Renderer for DoubleSettlingRenderer {
	async fn render_to_string(&self, _page: &Page) -> Result<String, SsrError> {
		// Simulates a render engine invoking its completion callback itself;
		// the orchestrator's own settlement afterwards must be absorbed.
		let ctx = grappelli::use_context()?;
		ctx.response().deferred().resolve("engine body".to_string());
		Ok("orchestrator body".to_string())
	}
}

#[tokio::test]
async fn test_double_settlement_is_absorbed_first_value_wins() {
	let options = SsrOptions::default().renderer(DoubleSettlingRenderer);
	let handler = create_handler(app, options, None);
	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.body, "engine body");
}

#[tokio::test]
async fn test_head_and_styles_flow_into_result() {
	let cleanups = Arc::new(AtomicUsize::new(0));
	let head_app = |_ctx: &SsrContext| {
		PageElement::new("div")
			.with_head(
				Head::new()
					.title("Landing")
					.meta("description", "a landing page")
					.html_attr("lang", "en")
					.body_attr("class", "dark"),
			)
			.child("content")
			.into_page()
	};
	let options = counting_collector_options(Arc::clone(&cleanups), ".body{}");
	let handler = create_handler(head_app, options, None);

	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.html, HTML_PLACEHOLDER);
	assert!(result.head_tags.contains("<title>Landing</title>"));
	assert!(result.head_tags.contains("name=\"description\""));
	assert!(result.head_tags.ends_with("<style>.body{}</style>"));
	assert_eq!(result.html_attrs, "lang=\"en\"");
	assert_eq!(result.body_attrs, "class=\"dark\"");
	assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_write_response_metadata_surfaces_in_result() {
	let hook: Hook = Arc::new(|ctx| {
		async move {
			ctx.write_response(ResponsePayload::new().status(201).header("x-request", "42"));
			Ok(None)
		}
		.boxed()
	});
	let handler = create_handler(app, SsrOptions::default(), Some(hook));
	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.response.status, Some(201));
	assert_eq!(
		result.response.headers.get("x-request").map(String::as_str),
		Some("42")
	);
}

#[tokio::test]
async fn test_hook_error_propagates() {
	let hook: Hook = Arc::new(|_ctx| async { Err("session store down".into()) }.boxed());
	let handler = create_handler(app, SsrOptions::default(), Some(hook));
	let outcome = handler.handle("/", RequestExtras::default()).await;
	match outcome {
		Err(SsrError::Hook(source)) => {
			assert_eq!(source.to_string(), "session store down");
		}
		other => panic!("expected hook error, got {other:?}"),
	}
}

struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
	async fn render_to_string(&self, _page: &Page) -> Result<String, SsrError> {
		Err(SsrError::render("engine crashed"))
	}
}

#[tokio::test]
async fn test_render_error_propagates_and_styles_are_released() {
	let cleanups = Arc::new(AtomicUsize::new(0));
	let options = counting_collector_options(Arc::clone(&cleanups), "")
		.renderer(FailingRenderer);
	let handler = create_handler(app, options, None);

	let outcome = handler.handle("/", RequestExtras::default()).await;
	assert!(matches!(outcome, Err(SsrError::Render(_))));
	assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

struct StateLoadingVisitor;

#[async_trait]
impl PrepassVisitor for StateLoadingVisitor {
	async fn visit(&self, element: &PageElement, ctx: &SsrContext) -> Result<(), SsrError> {
		if element.tag_name() == "div" {
			ctx.insert_state("loaded", json!(true));
		}
		Ok(())
	}
}

#[tokio::test]
async fn test_prepass_data_load_reaches_serialized_state() {
	let options = SsrOptions::default().prepass_visitor(StateLoadingVisitor);
	let handler = create_handler(app, options, None);
	let result = handler
		.handle("/", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.initial_state, r#"'{"loaded":true}'"#);
}

#[tokio::test]
async fn test_routed_page_renders_through_outlet() {
	let routes = vec![
		Route::new("/", home),
		Route::new("/users/{id}/", |m: &grappelli::RouteMatch| {
			let id = m.params.get("id").cloned().unwrap_or_default();
			Page::text(format!("User {id}"))
		}),
	];
	let handler = create_handler(app, SsrOptions::default().routes(routes), None);

	let result = handler
		.handle("/users/7/?tab=posts", RequestExtras::default())
		.await
		.unwrap()
		.rendered()
		.unwrap();
	assert_eq!(result.body, "<div id=\"app\">User 7</div>");
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_state() {
	let hook: Hook = Arc::new(|ctx| {
		async move {
			let path = ctx.url().path().to_string();
			ctx.insert_state("path", json!(path));
			Ok(None)
		}
		.boxed()
	});
	let handler = Arc::new(create_handler(app, SsrOptions::default(), Some(hook)));

	let a = {
		let handler = Arc::clone(&handler);
		tokio::spawn(async move { handler.handle("/a", RequestExtras::default()).await })
	};
	let b = {
		let handler = Arc::clone(&handler);
		tokio::spawn(async move { handler.handle("/b", RequestExtras::default()).await })
	};
	let result_a = a.await.unwrap().unwrap().rendered().unwrap();
	let result_b = b.await.unwrap().unwrap().rendered().unwrap();
	assert_eq!(result_a.initial_state, r#"'{"path":"/a"}'"#);
	assert_eq!(result_b.initial_state, r#"'{"path":"/b"}'"#);
}
