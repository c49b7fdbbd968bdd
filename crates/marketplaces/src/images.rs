//! Product image references.
//!
//! Catalog images are either absolute http(s) URLs or paths of files the
//! seller uploaded locally (`/static/uploads/mug.jpg`).

use std::path::{Component, Path, PathBuf};

use url::Url;

pub fn is_remote(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Absolute http(s) URL for `reference`, resolving relative paths against
/// the public base URL the app is served from.
pub fn absolute_url(reference: &str, public_base: Option<&Url>) -> Result<Url, String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err("image reference is blank".to_string());
    }

    let url = match Url::parse(reference) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = public_base
                .ok_or_else(|| format!("{reference} is relative and no public base url is configured"))?;
            base.join(reference).map_err(|e| format!("{reference}: {e}"))?
        }
        Err(e) => return Err(format!("{reference}: {e}")),
    };

    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        scheme => Err(format!("{reference}: unsupported image url scheme {scheme}")),
    }
}

/// Filesystem location of a locally uploaded image under `media_root`.
/// Remote URLs and paths escaping the root yield `None`.
pub fn local_path(reference: &str, media_root: &Path) -> Option<PathBuf> {
    if is_remote(reference) {
        return None;
    }
    let relative = Path::new(reference.trim().trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(media_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.com").unwrap()
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = absolute_url("https://cdn.example.com/a.jpg", None).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn relative_paths_resolve_against_the_public_base() {
        let url = absolute_url("/static/uploads/mug.jpg", Some(&base())).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/static/uploads/mug.jpg");
    }

    #[test]
    fn relative_paths_without_a_base_are_rejected() {
        assert!(absolute_url("/static/uploads/mug.jpg", None).is_err());
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(absolute_url("ftp://files.example.com/a.jpg", Some(&base())).is_err());
        assert!(absolute_url("data:image/png;base64,AAAA", Some(&base())).is_err());
        assert!(absolute_url("   ", Some(&base())).is_err());
    }

    #[test]
    fn local_paths_stay_under_the_media_root() {
        let root = Path::new("/srv/app");
        assert_eq!(
            local_path("/static/uploads/mug.jpg", root),
            Some(PathBuf::from("/srv/app/static/uploads/mug.jpg"))
        );
        assert_eq!(local_path("/static/../../etc/passwd", root), None);
        assert_eq!(local_path("https://cdn.example.com/a.jpg", root), None);
        assert_eq!(local_path("/", root), None);
    }
}
