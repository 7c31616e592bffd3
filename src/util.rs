//! Small utility helpers used across modules.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{ForgeError, Result};

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// 32-bit multiplicative string hash (`h = h * 31 + unit`, wrapping).
/// Stable across runs and platforms, so derived choices are reproducible.
pub fn simple_hash(text: &str) -> u32 {
  text
    .encode_utf16()
    .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32))
}

/// Deterministically pick one entry of `list` keyed by `key`. None on an empty list.
pub fn pick_deterministic<'a, T>(list: &'a [T], key: &str) -> Option<&'a T> {
  if list.is_empty() {
    return None;
  }
  list.get(simple_hash(key) as usize % list.len())
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Serialize `value` as pretty JSON and replace `path` via a sibling temp file + rename.
/// A failed write leaves the previous file intact.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
    }
  }

  let content = serde_json::to_string_pretty(value).map_err(|e| ForgeError::json(path, e))?;
  let temp_path = path.with_extension("json.tmp");

  let written = std::fs::File::create(&temp_path).and_then(|mut file| {
    file.write_all(content.as_bytes())?;
    file.sync_all()
  });
  if let Err(e) = written {
    let _ = std::fs::remove_file(&temp_path);
    return Err(ForgeError::io(&temp_path, e));
  }

  if let Err(e) = std::fs::rename(&temp_path, path) {
    let _ = std::fs::remove_file(&temp_path);
    return Err(ForgeError::io(path, e));
  }
  Ok(())
}
