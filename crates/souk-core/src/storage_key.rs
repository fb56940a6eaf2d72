//! Object-storage key construction from user-supplied filenames.
//!
//! Keys consist of `[A-Za-z0-9._-]` segments joined by `/`. No segment is
//! empty, starts with a dot, or equals `..`.

use std::fmt;

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization as _;

pub const MAX_SEGMENT_CHARS: usize = 120;
pub const MAX_SCOPE_CHARS: usize = 60;
const MAX_EXTENSION_CHARS: usize = 10;
const MAX_KEY_CHARS: usize = 512;

/// Quote marks removed outright instead of becoming separators.
const QUOTES: &[char] = &['\'', '’', '‘', '`', '“', '”', '"', '«', '»'];

fn is_safe_char(c: char) -> bool { c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') }

fn is_combining_mark(c: char) -> bool { ('\u{0300}'..='\u{036f}').contains(&c) }

/// Reduce arbitrary text to a single safe key segment.
///
/// Diacritics are folded (`é` → `e`), quotes dropped, whitespace and any other
/// unsafe character replaced by `-`, runs of `-` or `.` collapsed, and leading
/// or trailing `-`/`.` trimmed. Returns `fallback` if nothing survives.
pub fn sanitize_segment(input: &str, max_len: usize, fallback: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
    if QUOTES.contains(&c) {
      continue;
    }
    let mapped = if is_safe_char(c) { c } else { '-' };
    if (mapped == '-' || mapped == '.') && out.ends_with(mapped) {
      continue;
    }
    out.push(mapped);
  }

  let trim = |s: &str| s.trim_matches(|c| c == '-' || c == '.').to_owned();
  let mut segment = trim(&out);
  if segment.len() > max_len {
    // Only ASCII survives the loop above, so byte truncation is safe.
    segment.truncate(max_len);
    segment = trim(&segment);
  }

  if segment.is_empty() { fallback.to_owned() } else { segment }
}

/// Split a filename into a sanitized base and a lower-cased extension
/// (including the dot, or empty).
fn split_filename(filename: &str) -> (String, String) {
  let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();
  let (base, ext) = match name.rsplit_once('.') {
    Some((base, ext))
      if !base.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_CHARS
        && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
    {
      (base, format!(".{}", ext.to_ascii_lowercase()))
    }
    _ => (name, String::new()),
  };
  (sanitize_segment(base, MAX_SEGMENT_CHARS, "file"), ext)
}

/// A validated object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
  /// Build `{prefix}/{scope}/{millis}-{nonce}-{base}{.ext}`.
  ///
  /// The timestamp and nonce make keys collision-resistant; every component
  /// is sanitized.
  pub fn build(
    prefix: &str,
    scope: &str,
    filename: &str,
    now: DateTime<Utc>,
    nonce: &str,
  ) -> Self {
    let prefix = sanitize_segment(prefix, MAX_SCOPE_CHARS, "misc");
    let scope = sanitize_segment(scope, MAX_SCOPE_CHARS, "misc");
    let nonce = sanitize_segment(nonce, 32, "0");
    let (base, ext) = split_filename(filename);
    Self(format!(
      "{prefix}/{scope}/{}-{nonce}-{base}{ext}",
      now.timestamp_millis()
    ))
  }

  /// Accept an existing key if it satisfies the key invariants.
  pub fn parse(raw: &str) -> Option<Self> {
    is_safe_key(raw).then(|| Self(raw.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for ObjectKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Whether `key` is made only of safe, non-empty, non-dot-leading segments.
pub fn is_safe_key(key: &str) -> bool {
  !key.is_empty()
    && key.len() <= MAX_KEY_CHARS
    && key.split('/').all(|seg| {
      !seg.is_empty() && !seg.starts_with('.') && seg.chars().all(is_safe_char)
    })
}
