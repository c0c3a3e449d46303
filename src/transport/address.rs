//! Socket address derivation.

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::debug;
use url::Url;

use super::error::{TransportError, TransportResult};

/// Derive the WebSocket address for a page.
///
/// `http` maps to `ws` and `https` to `wss`; host and port are kept and
/// `path` replaces the page's own path, query and fragment. `ws`/`wss` URLs
/// are accepted as-is. International host names come back in their ASCII
/// (punycode) form. The result is guaranteed to be a valid handshake target.
pub fn socket_address(page_url: &str, path: &str) -> TransportResult<String> {
    let invalid = |reason: String| TransportError::InvalidAddress {
        url: page_url.to_string(),
        reason,
    };

    let mut url = Url::parse(page_url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    url.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch to '{}'", scheme)))?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);

    let address = url.to_string();
    if let Err(e) = address.as_str().into_client_request() {
        debug!("Derived address {} is not a valid request: {}", address, e);
        return Err(invalid(e.to_string()));
    }
    Ok(address)
}
