//! Element tree consumed by the renderer.
//!
//! [`Page`] is the unified representation of renderable content: elements,
//! text, fragments, or nothing. Elements may carry an attached [`Head`]
//! describing document metadata; the orchestrator extracts the topmost head
//! after the body render.

use std::borrow::Cow;

/// A unified representation of renderable content.
#[derive(Debug, Clone)]
pub enum Page {
	/// An element with a tag, attributes, and children.
	Element(PageElement),
	/// A text node. Escaped on render.
	Text(Cow<'static, str>),
	/// A sequence of pages with no wrapper element.
	Fragment(Vec<Page>),
	/// Renders nothing.
	Empty,
}

/// An element in the page tree.
#[derive(Debug, Clone)]
pub struct PageElement {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	children: Vec<Page>,
	is_void: bool,
	head: Option<Head>,
}

impl PageElement {
	/// Creates a new element.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = matches!(
			tag.as_ref(),
			"area"
				| "base" | "br"
				| "col" | "embed"
				| "hr" | "img"
				| "input" | "link"
				| "meta" | "source"
				| "track" | "wbr"
		);
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
			head: None,
		}
	}

	/// Adds an attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a child.
	pub fn child(mut self, child: impl IntoPage) -> Self {
		self.children.push(child.into_page());
		self
	}

	/// Adds multiple children.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		self.children
			.extend(children.into_iter().map(IntoPage::into_page));
		self
	}

	/// Attaches document metadata to this element.
	pub fn with_head(mut self, head: Head) -> Self {
		self.head = Some(head);
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the attributes.
	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	/// Returns the children.
	pub fn child_pages(&self) -> &[Page] {
		&self.children
	}

	/// Returns the attached head, if any.
	pub fn head(&self) -> Option<&Head> {
		self.head.as_ref()
	}
}

impl Page {
	/// Creates an element builder.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> PageElement {
		PageElement::new(tag)
	}

	/// Creates a text node.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		Self::Fragment(children.into_iter().map(IntoPage::into_page).collect())
	}

	/// Creates an empty page.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Renders the tree to an HTML string.
	pub fn render_to_string(&self) -> String {
		let mut output = String::new();
		self.render_inner(&mut output);
		output
	}

	fn render_inner(&self, output: &mut String) {
		match self {
			Page::Element(el) => {
				output.push('<');
				output.push_str(el.tag_name());
				for (name, value) in el.attrs() {
					output.push(' ');
					output.push_str(name);
					output.push_str("=\"");
					output.push_str(&html_escape(value));
					output.push('"');
				}
				if el.is_void {
					output.push_str(" />");
				} else {
					output.push('>');
					for child in el.child_pages() {
						child.render_inner(output);
					}
					output.push_str("</");
					output.push_str(el.tag_name());
					output.push('>');
				}
			}
			Page::Text(text) => output.push_str(&html_escape(text)),
			Page::Fragment(children) => {
				for child in children {
					child.render_inner(output);
				}
			}
			Page::Empty => {}
		}
	}

	/// Finds the head attached closest to the root, depth-first.
	pub fn find_topmost_head(&self) -> Option<&Head> {
		match self {
			Page::Element(el) => el
				.head()
				.or_else(|| el.child_pages().iter().find_map(Page::find_topmost_head)),
			Page::Fragment(children) => children.iter().find_map(Page::find_topmost_head),
			Page::Text(_) | Page::Empty => None,
		}
	}
}

/// Trait for types convertible into a [`Page`].
pub trait IntoPage {
	/// Converts self into a page.
	fn into_page(self) -> Page;
}

impl IntoPage for Page {
	fn into_page(self) -> Page {
		self
	}
}

impl IntoPage for PageElement {
	fn into_page(self) -> Page {
		Page::Element(self)
	}
}

impl IntoPage for String {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self))
	}
}

impl IntoPage for &'static str {
	fn into_page(self) -> Page {
		Page::Text(Cow::Borrowed(self))
	}
}

impl<T: IntoPage> IntoPage for Option<T> {
	fn into_page(self) -> Page {
		match self {
			Some(value) => value.into_page(),
			None => Page::Empty,
		}
	}
}

impl<T: IntoPage> IntoPage for Vec<T> {
	fn into_page(self) -> Page {
		Page::Fragment(self.into_iter().map(IntoPage::into_page).collect())
	}
}

impl IntoPage for () {
	fn into_page(self) -> Page {
		Page::Empty
	}
}

/// Document metadata attached to the page tree.
///
/// The orchestrator extracts the topmost head after rendering and folds it
/// into the final result: `<head>` tags plus attribute strings for the
/// `<html>` and `<body>` elements.
#[derive(Debug, Clone, Default)]
pub struct Head {
	/// Document title.
	pub title: Option<String>,
	/// `<meta>` tags.
	pub meta_tags: Vec<MetaTag>,
	/// `<link>` tags.
	pub links: Vec<LinkTag>,
	/// Inline `<style>` tags.
	pub styles: Vec<StyleTag>,
	/// `<script>` tags.
	pub scripts: Vec<ScriptTag>,
	/// Attributes for the `<html>` element.
	pub html_attrs: Vec<(String, String)>,
	/// Attributes for the `<body>` element.
	pub body_attrs: Vec<(String, String)>,
}

impl Head {
	/// Creates an empty head.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Adds a `<meta>` tag.
	pub fn meta(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
		self.meta_tags.push(MetaTag {
			name: name.into(),
			content: content.into(),
		});
		self
	}

	/// Adds a `<link>` tag.
	pub fn link(mut self, rel: impl Into<String>, href: impl Into<String>) -> Self {
		self.links.push(LinkTag {
			rel: rel.into(),
			href: href.into(),
		});
		self
	}

	/// Adds an inline `<style>` tag.
	pub fn style(mut self, css: impl Into<String>) -> Self {
		self.styles.push(StyleTag { css: css.into() });
		self
	}

	/// Adds a `<script src>` tag.
	pub fn script(mut self, src: impl Into<String>) -> Self {
		self.scripts.push(ScriptTag { src: src.into() });
		self
	}

	/// Adds an `<html>` element attribute.
	pub fn html_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.html_attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a `<body>` element attribute.
	pub fn body_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.body_attrs.push((name.into(), value.into()));
		self
	}

	/// Renders the head tags (title, meta, links, styles, scripts).
	pub fn to_tags_string(&self) -> String {
		let mut out = String::new();
		if let Some(title) = &self.title {
			out.push_str("<title>");
			out.push_str(&html_escape(title));
			out.push_str("</title>");
		}
		for meta in &self.meta_tags {
			out.push_str(&meta.to_html());
		}
		for link in &self.links {
			out.push_str(&link.to_html());
		}
		for style in &self.styles {
			out.push_str(&style.to_html());
		}
		for script in &self.scripts {
			out.push_str(&script.to_html());
		}
		out
	}

	/// Renders the `<html>` element attribute string.
	pub fn html_attrs_string(&self) -> String {
		attrs_string(&self.html_attrs)
	}

	/// Renders the `<body>` element attribute string.
	pub fn body_attrs_string(&self) -> String {
		attrs_string(&self.body_attrs)
	}
}

/// A `<meta>` tag.
#[derive(Debug, Clone)]
pub struct MetaTag {
	/// The `name` attribute.
	pub name: String,
	/// The `content` attribute.
	pub content: String,
}

impl MetaTag {
	/// Renders the tag.
	pub fn to_html(&self) -> String {
		format!(
			"<meta name=\"{}\" content=\"{}\" />",
			html_escape(&self.name),
			html_escape(&self.content)
		)
	}
}

/// A `<link>` tag.
#[derive(Debug, Clone)]
pub struct LinkTag {
	/// The `rel` attribute.
	pub rel: String,
	/// The `href` attribute.
	pub href: String,
}

impl LinkTag {
	/// Renders the tag.
	pub fn to_html(&self) -> String {
		format!(
			"<link rel=\"{}\" href=\"{}\" />",
			html_escape(&self.rel),
			html_escape(&self.href)
		)
	}
}

/// An inline `<style>` tag.
#[derive(Debug, Clone)]
pub struct StyleTag {
	/// The CSS payload, emitted verbatim.
	pub css: String,
}

impl StyleTag {
	/// Renders the tag.
	pub fn to_html(&self) -> String {
		format!("<style>{}</style>", self.css)
	}
}

/// A `<script src>` tag.
#[derive(Debug, Clone)]
pub struct ScriptTag {
	/// The `src` attribute.
	pub src: String,
}

impl ScriptTag {
	/// Renders the tag.
	pub fn to_html(&self) -> String {
		format!("<script src=\"{}\"></script>", html_escape(&self.src))
	}
}

fn attrs_string(attrs: &[(String, String)]) -> String {
	let mut out = String::new();
	for (i, (name, value)) in attrs.iter().enumerate() {
		if i > 0 {
			out.push(' ');
		}
		out.push_str(name);
		out.push_str("=\"");
		out.push_str(&html_escape(value));
		out.push('"');
	}
	out
}

/// Escapes HTML special characters.
pub(crate) fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}
