//! Initial-state serialization for client resumption.
//!
//! The rendered page embeds the request's initial state inside a script
//! context so the client can pick the application up without re-fetching.
//! The payload is emitted as a single-quoted string literal, which keeps
//! JSON double quotes untouched and needs only two classes of escapes:
//! single quotes (so the literal cannot terminate early) and angle brackets
//! (so the markup cannot terminate early).

use serde_json::Value;

use crate::error::SsrError;

/// Serializes a state value into a single-quoted script-string literal.
///
/// Guarantees:
/// - `{}` serializes to the literal `'{}'`.
/// - Double quotes are left as-is; the literal delimiter is the single quote.
/// - `'` becomes `\'`, `<` becomes `\u003C`, `>` becomes `\u003E`.
/// - Output is deterministic for a given value; mapping keys keep insertion
///   order (`serde_json` with `preserve_order`).
pub fn serialize_state(state: &Value) -> Result<String, SsrError> {
	let json = serde_json::to_string(state)?;
	let mut out = String::with_capacity(json.len() + 2);
	out.push('\'');
	for c in json.chars() {
		match c {
			'\'' => out.push_str("\\'"),
			'<' => out.push_str("\\u003C"),
			'>' => out.push_str("\\u003E"),
			_ => out.push(c),
		}
	}
	out.push('\'');
	Ok(out)
}
