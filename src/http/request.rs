//! Neutral request records handed to the API bundle.
//!
//! The bundle never sees platform HTTP types; requests are flattened into
//! plain maps and byte buffers before dispatch.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Uri, Version};

/// Transport facts about one side of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetails {
    pub scheme: String,
    pub version: String,
    pub local_address: String,
    pub local_host: String,
    pub local_port: u16,
    pub remote_address: String,
    pub remote_host: String,
    pub remote_port: u16,
    pub server_address: String,
    pub server_host: String,
    pub server_port: u16,
}

/// The origin view (as the client named the server) and the local view (as
/// the socket reports it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConnection {
    pub origin: ConnectionDetails,
    pub local: ConnectionDetails,
}

/// The flattened request record dispatched to the bundle.
#[derive(Debug, Clone)]
pub struct NeutralRequest {
    pub connection: RequestConnection,
    pub method: Method,
    /// First value per query parameter name.
    pub query: HashMap<String, String>,
    /// Lowercased header names; repeated headers joined with `, `.
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Present only for PATCH/POST/PUT with a non-empty body.
    pub body: Option<Vec<u8>>,
    /// Present iff `body` is present.
    pub body_content_type: Option<String>,
}

/// Flatten request parts into a `NeutralRequest`.
///
/// `body` must already respect the method rule: callers read it only for
/// PATCH/POST/PUT. An empty body becomes `None` here.
pub fn build_neutral_request(
    method: Method,
    uri: &Uri,
    version: Version,
    header_map: &HeaderMap,
    body: Option<Vec<u8>>,
    remote: SocketAddr,
    local: SocketAddr,
) -> NeutralRequest {
    let headers = flatten_headers(header_map);
    let cookies = parse_cookies(&headers);
    let query = parse_query(uri);

    let body = body.filter(|b| !b.is_empty());
    let body_content_type = body
        .as_ref()
        .and_then(|_| headers.get("content-type").cloned());

    let version = format!("{version:?}");
    let host_header = headers.get("host").cloned();
    let connection = RequestConnection {
        origin: connection_details(&version, remote, local, host_header.as_deref()),
        local: connection_details(&version, remote, local, None),
    };

    NeutralRequest {
        connection,
        method,
        query,
        headers,
        cookies,
        body,
        body_content_type,
    }
}

fn connection_details(
    version: &str,
    remote: SocketAddr,
    local: SocketAddr,
    host_header: Option<&str>,
) -> ConnectionDetails {
    let (server_host, server_port) = match host_header {
        Some(host) => match host.rsplit_once(':') {
            Some((h, p)) => (h.to_string(), p.parse().unwrap_or(local.port())),
            None => (host.to_string(), local.port()),
        },
        None => (local.ip().to_string(), local.port()),
    };

    ConnectionDetails {
        scheme: "http".to_string(),
        version: version.to_string(),
        local_address: local.to_string(),
        local_host: local.ip().to_string(),
        local_port: local.port(),
        remote_address: remote.to_string(),
        remote_host: remote.ip().to_string(),
        remote_port: remote.port(),
        server_address: format!("{server_host}:{server_port}"),
        server_host,
        server_port,
    }
}

/// Lowercase names, join repeated values with `, `.
pub fn flatten_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    for name in header_map.keys() {
        let joined = header_map
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        headers.insert(name.as_str().to_ascii_lowercase(), joined);
    }
    headers
}

/// First value wins for repeated parameter names.
pub fn parse_query(uri: &Uri) -> HashMap<String, String> {
    let mut query = HashMap::new();
    if let Some(q) = uri.query() {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            query.entry(k.to_string()).or_insert_with(|| v.to_string());
        }
    }
    query
}

pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_first_value_wins() {
        let uri: Uri = "/api/echo?x=1&x=2&y=b".parse().unwrap();
        let q = parse_query(&uri);
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"b".to_string()));
    }

    #[test]
    fn test_parse_cookies() {
        let mut h = HashMap::new();
        h.insert("cookie".to_string(), "a=b; c=d".to_string());
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn test_empty_body_becomes_none() {
        let uri: Uri = "/api/echo".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        let req = build_neutral_request(
            Method::POST,
            &uri,
            Version::HTTP_11,
            &headers,
            Some(Vec::new()),
            "1.2.3.4:5678".parse().unwrap(),
            "127.0.0.1:8080".parse().unwrap(),
        );
        assert!(req.body.is_none());
        assert!(req.body_content_type.is_none());
    }

    #[test]
    fn test_body_content_type_present_iff_body() {
        let uri: Uri = "/api/echo".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        let req = build_neutral_request(
            Method::POST,
            &uri,
            Version::HTTP_11,
            &headers,
            Some(b"{\"x\":1}".to_vec()),
            "1.2.3.4:5678".parse().unwrap(),
            "127.0.0.1:8080".parse().unwrap(),
        );
        assert_eq!(req.body.as_deref(), Some(b"{\"x\":1}".as_slice()));
        assert_eq!(req.body_content_type.as_deref(), Some("application/json"));
    }
}
