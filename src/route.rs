//! URL and path utilities.
//!
//! Requests arrive as raw strings that may be absolute URLs or bare paths.
//! These helpers normalize them into a canonical [`Url`] and compute the
//! base-relative full path handed to the router. All functions are pure.

use url::Url;

use crate::error::SsrError;

/// Origin used to absolutize bare request paths.
///
/// The `url` crate requires absolute URLs; server-side we only care about
/// path, query, and fragment, so any fixed origin works.
const SYNTHETIC_ORIGIN: &str = "http://localhost";

/// Parses a raw request URL into a canonical [`Url`].
///
/// Bare paths such as `/users/42?tab=posts` are resolved against a synthetic
/// origin. Fails with [`SsrError::InvalidUrl`] when no URL is derivable.
pub fn create_url(raw: &str) -> Result<Url, SsrError> {
	match Url::parse(raw) {
		Ok(url) => Ok(url),
		Err(url::ParseError::RelativeUrlWithoutBase) => {
			let origin = Url::parse(SYNTHETIC_ORIGIN).map_err(|source| SsrError::InvalidUrl {
				raw: raw.to_string(),
				source,
			})?;
			origin.join(raw).map_err(|source| SsrError::InvalidUrl {
				raw: raw.to_string(),
				source,
			})
		}
		Err(source) => Err(SsrError::InvalidUrl {
			raw: raw.to_string(),
			source,
		}),
	}
}

/// Concatenates the base prefix and the URL's path, query, and fragment.
pub fn get_full_path(url: &Url, base: Option<&str>) -> String {
	let mut full = String::from(base.unwrap_or_default());
	full.push_str(url.path());
	if let Some(query) = url.query() {
		full.push('?');
		full.push_str(query);
	}
	if let Some(fragment) = url.fragment() {
		full.push('#');
		full.push_str(fragment);
	}
	full
}

/// Strips a trailing suffix if present; identity otherwise.
pub fn without_suffix<'a>(value: &'a str, suffix: &str) -> &'a str {
	if suffix.is_empty() {
		return value;
	}
	value.strip_suffix(suffix).unwrap_or(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_create_url_absolute() {
		let url = create_url("https://example.com/a/b?x=1").unwrap();
		assert_eq!(url.path(), "/a/b");
		assert_eq!(url.query(), Some("x=1"));
	}

	#[test]
	fn test_create_url_bare_path() {
		let url = create_url("/users/42?tab=posts#top").unwrap();
		assert_eq!(url.path(), "/users/42");
		assert_eq!(url.query(), Some("tab=posts"));
		assert_eq!(url.fragment(), Some("top"));
	}

	#[test]
	fn test_create_url_invalid() {
		assert!(matches!(
			create_url("http://[not-a-host/"),
			Err(SsrError::InvalidUrl { .. })
		));
	}

	#[test]
	fn test_get_full_path_without_base() {
		let url = create_url("/a/b?x=1#frag").unwrap();
		assert_eq!(get_full_path(&url, None), "/a/b?x=1#frag");
	}

	#[test]
	fn test_get_full_path_with_base() {
		let url = create_url("/a/b").unwrap();
		assert_eq!(get_full_path(&url, Some("/app")), "/app/a/b");
	}

	#[rstest]
	#[case("/app/", "/", "/app")]
	#[case("/app", "/", "/app")]
	#[case("base.html", ".html", "base")]
	#[case("", "/", "")]
	#[case("/", "", "/")]
	fn test_without_suffix(#[case] value: &str, #[case] suffix: &str, #[case] expected: &str) {
		assert_eq!(without_suffix(value, suffix), expected);
	}
}
