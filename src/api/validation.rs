use super::error::ApiError;
use url::Url;

/// Accept only absolute http(s) URLs; the downloader binary gets handed
/// this string verbatim.
pub fn validate_url(raw: &str) -> Result<(), ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::InvalidUrl(format!(
            "unsupported scheme: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(validate_url("https://example.com/watch?v=abc").is_ok());
        assert!(validate_url("http://example.com/playlist?list=x").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }
}
