//! URL validation and origin helpers for the page fetcher.

use reqwest::Url;

use crate::error::ExtractError;

/// Parses `url` and requires an `http` or `https` scheme.
pub(super) fn parse_page_url(url: &str) -> Result<Url, ExtractError> {
    let parsed = Url::parse(url).map_err(|e| ExtractError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ExtractError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme \"{other}\""),
        }),
    }
}

/// Scheme + host of `url`, sent as the `Referer` so requests look like
/// same-site navigation.
pub(super) fn page_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Hostname of `url` for error messages. Falls back to the full string.
pub(super) fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_page_url_accepts_http_and_https() {
        assert!(parse_page_url("https://www.rei.com/c/shoes").is_ok());
        assert!(parse_page_url("http://localhost:8080/").is_ok());
    }

    #[test]
    fn parse_page_url_rejects_other_schemes() {
        let err = parse_page_url("ftp://example.com/file").unwrap_err();
        assert!(
            matches!(err, ExtractError::InvalidUrl { ref reason, .. } if reason.contains("ftp")),
            "got: {err:?}"
        );
    }

    #[test]
    fn parse_page_url_rejects_garbage() {
        assert!(matches!(
            parse_page_url("not a url"),
            Err(ExtractError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn page_origin_drops_path_and_query() {
        let url = Url::parse("https://www.nike.com/w/sale-shoes?sort=new").unwrap();
        assert_eq!(page_origin(&url), "https://www.nike.com");
    }

    #[test]
    fn extract_domain_falls_back_to_input() {
        assert_eq!(
            extract_domain("https://www.patagonia.com/shop"),
            "www.patagonia.com"
        );
        assert_eq!(extract_domain("garbage"), "garbage");
    }
}
