//! Outbound request construction.
//!
//! Every delivery is a `POST` of the raw payload as `application/json;
//! charset=utf-8`. Endpoint headers are placed by trying each
//! [`HeaderPlacement`] in order; a header nobody accepts is logged and left
//! out, and the rest of the request goes out unchanged.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::types::WorkItem;

/// Content type sent with every payload.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Headers that describe the body rather than the request.
const CONTENT_HEADERS: [HeaderName; 9] = [
    header::ALLOW,
    header::CONTENT_DISPOSITION,
    header::CONTENT_ENCODING,
    header::CONTENT_LANGUAGE,
    header::CONTENT_LOCATION,
    header::CONTENT_RANGE,
    header::CONTENT_TYPE,
    header::EXPIRES,
    header::LAST_MODIFIED,
];

/// Headers the transport owns. Neither placement accepts them.
const FRAMING_HEADERS: [HeaderName; 4] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::HOST,
    header::TRANSFER_ENCODING,
];

/// A fully built delivery request, transport agnostic.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub body: String,
    /// Request-level headers.
    pub headers: HeaderMap,
    /// Headers describing the body. Always carries `content-type`.
    pub content_headers: HeaderMap,
}

impl OutboundRequest {
    /// All headers as sent on the wire. Content headers win on conflict.
    pub fn wire_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        for (name, value) in &self.content_headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

/// Where an endpoint header can go, in the order placements are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPlacement {
    Request,
    Content,
}

impl HeaderPlacement {
    pub const ORDER: [HeaderPlacement; 2] = [HeaderPlacement::Request, HeaderPlacement::Content];

    /// Try to add the header; returns `false` if this placement rejects it.
    pub fn try_place(self, request: &mut OutboundRequest, name: &str, value: &str) -> bool {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            return false;
        };

        if FRAMING_HEADERS.contains(&name) {
            return false;
        }

        let is_content = CONTENT_HEADERS.contains(&name);
        match self {
            HeaderPlacement::Request if !is_content => {
                request.headers.append(name, value);
                true
            }
            HeaderPlacement::Content if is_content => {
                request.content_headers.insert(name, value);
                true
            }
            _ => false,
        }
    }
}

/// Build the request for one attempt of `item`.
pub fn build_request(item: &WorkItem) -> OutboundRequest {
    let endpoint = &item.endpoint;

    let mut content_headers = HeaderMap::new();
    content_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    let mut request = OutboundRequest {
        url: endpoint.url.clone(),
        body: item.payload.to_string(),
        headers: HeaderMap::new(),
        content_headers,
    };

    for (name, value) in &endpoint.headers {
        let placed = HeaderPlacement::ORDER
            .iter()
            .any(|placement| placement.try_place(&mut request, name, value));

        if !placed {
            metric_inc("webhook.header.rejected");
            tracing::warn!(
                endpoint_id = %endpoint.id,
                header = %name,
                "invalid header dropped from webhook request"
            );
        }
    }

    request
}

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}
