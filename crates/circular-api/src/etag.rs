//! Response versions as HTTP entity tags.

use axum::http::{HeaderMap, header};

use crate::error::ApiError;

/// The strong ETag for a response version, e.g. `"3"`.
pub fn etag(version: u32) -> String { format!("\"{version}\"") }

/// The version named by `If-Match`, if the header is present.
///
/// `*` matches any version. A value that is not one of our tags can never
/// match, so it fails the precondition against `current`.
pub fn if_match(headers: &HeaderMap, current: u32) -> Result<Option<u32>, ApiError> {
  let Some(value) = headers.get(header::IF_MATCH) else {
    return Ok(None);
  };
  let value = value
    .to_str()
    .map_err(|_| ApiError::PreconditionFailed { current })?
    .trim();
  if value == "*" {
    return Ok(None);
  }

  let version = strip_etag_quotes(value.trim_start_matches("W/"))
    .parse::<u32>()
    .map_err(|_| ApiError::PreconditionFailed { current })?;
  if version != current {
    return Err(ApiError::PreconditionFailed { current });
  }
  Ok(Some(version))
}

/// `If-Match` may carry the tag with or without surrounding quotes.
fn strip_etag_quotes(s: &str) -> &str { s.trim_matches('"') }

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::IF_MATCH, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn absent_or_wildcard_matches() {
    assert_eq!(if_match(&HeaderMap::new(), 4).unwrap(), None);
    assert_eq!(if_match(&headers("*"), 4).unwrap(), None);
  }

  #[test]
  fn quoted_and_bare_tags_are_accepted() {
    assert_eq!(if_match(&headers("\"4\""), 4).unwrap(), Some(4));
    assert_eq!(if_match(&headers("4"), 4).unwrap(), Some(4));
  }

  #[test]
  fn stale_or_foreign_tags_fail() {
    assert!(matches!(
      if_match(&headers("\"3\""), 4),
      Err(ApiError::PreconditionFailed { current: 4 })
    ));
    assert!(matches!(
      if_match(&headers("\"abc\""), 4),
      Err(ApiError::PreconditionFailed { .. })
    ));
  }

  #[test]
  fn etag_is_quoted() {
    assert_eq!(etag(7), "\"7\"");
  }
}
