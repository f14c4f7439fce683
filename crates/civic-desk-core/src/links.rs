//! Link helpers.
//!
//! Records from the site's listing API carry their link in one of several
//! fields, often as a site-relative path. These helpers pick the link and
//! turn it into an absolute URL for display.

/// Return the first candidate that is present and non-blank, trimmed.
pub fn first_link(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Derive an absolute URL from a possibly relative link.
///
/// Absolute `http(s)` links and protocol-relative links are returned as-is
/// (the latter with `https:` prepended). Everything else is joined onto
/// `base_url` with exactly one slash in between.
pub fn absolute_url(base_url: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    let lower = link.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(link.to_string());
    }
    if let Some(rest) = link.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Some(link.to_string());
    }
    Some(format!("{}/{}", base, link.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_link_skips_blank() {
        let link = first_link(&[None, Some("  "), Some(" /a.pdf "), Some("/b.pdf")]);
        assert_eq!(link.as_deref(), Some("/a.pdf"));
        assert_eq!(first_link(&[None, Some("")]), None);
    }

    #[test]
    fn test_absolute_url_variants() {
        let base = "https://www.pmc.gov.in/";
        assert_eq!(
            absolute_url(base, "/sites/default/files/x.pdf").as_deref(),
            Some("https://www.pmc.gov.in/sites/default/files/x.pdf")
        );
        assert_eq!(
            absolute_url(base, "files/x.pdf").as_deref(),
            Some("https://www.pmc.gov.in/files/x.pdf")
        );
        assert_eq!(
            absolute_url(base, "HTTPS://other.org/y").as_deref(),
            Some("HTTPS://other.org/y")
        );
        assert_eq!(
            absolute_url(base, "//cdn.example.org/z").as_deref(),
            Some("https://cdn.example.org/z")
        );
        assert_eq!(absolute_url(base, "   "), None);
        assert_eq!(absolute_url("", "/x").as_deref(), Some("/x"));
    }
}
