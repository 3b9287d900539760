use std::sync::LazyLock;

use regex::Regex;

static SOURCEMAP_URL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\/\*[@#]\s*sourceMappingURL\s*=\s*(?<url>\S+)\s*\*\/\s*$").unwrap()
});

/// Removes a trailing sourceMappingURL comment, along with the whitespace
/// that separated it from the rest of the stylesheet
pub fn strip_sourcemap_url(css: &str) -> &str {
  match SOURCEMAP_URL.find(css) {
    Some(found) => css[..found.start()].trim_end(),
    None => css,
  }
}
