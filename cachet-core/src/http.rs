// HTTP request and response types

use crate::headers::HeaderMap;

/// Incoming request, as far as cache negotiation needs to see it.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get a request header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 304 with an empty body.
    pub fn not_modified() -> Self {
        Self::new(304)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let request = HttpRequest::new("GET", "/articles/1").with_header("If-None-Match", "\"v3\"");

        assert_eq!(request.method, "GET");
        assert_eq!(request.header("if-none-match"), Some("\"v3\""));
        assert_eq!(request.header("If-Modified-Since"), None);
    }

    #[test]
    fn test_response_builders() {
        let response = HttpResponse::ok()
            .with_header("Content-Type", "text/plain")
            .with_body("hello");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"hello".to_vec());
        assert!(!response.is_not_modified());

        let response = HttpResponse::not_modified();
        assert!(response.is_not_modified());
        assert!(response.body.is_empty());
    }
}
