//! Network passthrough for fully-qualified glyph and sprite URLs.

use super::StoreError;
use crate::provider::AsyncHttpClient;
use tracing::debug;

/// Returns true for `http://` and `https://` URLs.
pub fn is_network_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetches the body of `url` into a buffer.
pub async fn fetch<C: AsyncHttpClient>(client: &C, url: &str) -> Result<Vec<u8>, StoreError> {
    let body = client.get(url).await?;
    debug!(url = url, bytes = body.len(), "Remote resource fetched");
    Ok(body)
}
