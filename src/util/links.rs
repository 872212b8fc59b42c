use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid link: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("Refusing to open {0} link")]
    UnsupportedScheme(String),
}

/// Parse a story link and check it is safe to hand to the system opener.
pub fn validate_link_for_open(link: &str) -> Result<Url, LinkError> {
    let url = Url::parse(link.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LinkError::UnsupportedScheme(other.to_string())),
    }
}

/// Open `link` in the default browser.
pub fn open_link(link: &str) -> anyhow::Result<()> {
    let url = validate_link_for_open(link)?;
    open::that(url.as_str())?;
    tracing::debug!(url = %url, "Opened link");
    Ok(())
}
