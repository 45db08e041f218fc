//! Host filter contract
//!
//! The host proxy calls the request filter before forwarding and the
//! response filter once the upstream answered. These traits are the only
//! view the session filter has of the host's request and response objects.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::types::{RequestOutcome, ResponseOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

/// Request-phase view of an exchange
pub trait FilterRequest: Send {
    /// Host-assigned id, unique per callback invocation
    fn id(&self) -> u32;

    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Raw request body, if the host buffered one
    fn body(&self) -> Option<Bytes> {
        None
    }
}

/// Response-phase view of an exchange
pub trait FilterResponse: Send {
    /// Host-assigned id, unique per callback invocation
    fn id(&self) -> u32;

    /// Status returned by the upstream
    fn status(&self) -> StatusCode;

    fn headers_mut(&mut self) -> &mut HeaderMap;
}

/// Lets the request filter answer the client directly, skipping the upstream
pub trait ResponseWriter: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_status(&mut self, status: StatusCode);
}

/// A request/response filter pair the host can register
#[async_trait]
pub trait HostFilter: Send + Sync {
    /// Name the filter is registered under
    fn name(&self) -> &str;

    /// Decode per-route configuration; failure aborts activation
    fn parse_conf(&self, raw: &[u8]) -> Result<SessionConfig>;

    async fn request_filter(
        &self,
        config: &SessionConfig,
        writer: &mut dyn ResponseWriter,
        request: &mut dyn FilterRequest,
    ) -> RequestOutcome;

    async fn response_filter(
        &self,
        config: &SessionConfig,
        response: &mut dyn FilterResponse,
    ) -> ResponseOutcome;
}

/// Header value as text; missing or non-UTF-8 values read as `None`
///
/// Only the first field named `name` is read, so a header split across
/// several fields (e.g. HTTP/2 `cookie` crumbs) is only partly seen.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Replace a header with `value`
pub fn set_header(headers: &mut HeaderMap, name: &HeaderName, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|e| SessionError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    headers.insert(name.clone(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::COOKIE;

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_str(&headers, &COOKIE), None);

        headers.insert(COOKIE, HeaderValue::from_static("sid=abc"));
        assert_eq!(header_str(&headers, &COOKIE), Some("sid=abc"));
    }

    #[test]
    fn test_header_str_reads_first_field_only() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("sid=abc"));
        assert_eq!(header_str(&headers, &COOKIE), Some("a=1"));
    }

    #[test]
    fn test_set_header_replaces() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));

        set_header(&mut headers, &COOKIE, "sid=xyz").unwrap();
        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(header_str(&headers, &COOKIE), Some("sid=xyz"));
    }

    #[test]
    fn test_set_header_rejects_control_chars() {
        let mut headers = HeaderMap::new();
        let err = set_header(&mut headers, &COOKIE, "bad\nvalue").unwrap_err();
        assert!(matches!(err, SessionError::InvalidHeader { .. }));
        assert!(headers.is_empty());
    }
}
