use thiserror::Error;
use url::Url;

/// Errors from feed URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Validates a URL string for use as a feed source.
///
/// A feed URL must parse and must use `http` or `https`; anything a GET
/// request cannot reach (e.g. `file://`, `ftp://`) is rejected up front, at
/// configure time, rather than surfacing as a transport error mid-fetch.
///
/// # Errors
///
/// Returns [`UrlValidationError`] if the URL cannot be parsed or the scheme
/// is not `http`/`https`.
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url)
}
