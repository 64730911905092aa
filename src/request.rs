use std::fmt;
use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};

use crate::{Body, CancelToken, Error, Result};

/// HTTP request fed into an executor chain.
///
/// The URL is kept as a string until the transport parses it, so requests
/// may carry a bare path that a [`with_base_url`] configuration completes.
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Target URL, possibly relative until configured.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional body, readable once unless replayable.
    pub body: Option<Body>,
    /// Optional cancellation signal attached to the request.
    pub cancel: Option<CancelToken>,
}

impl Request {
    /// Creates a bodyless request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            cancel: None,
        }
    }

    /// Attaches a body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Configuration visitor applied to a request before it enters the pipeline.
pub type ConfigureRequest = Arc<dyn Fn(Request) -> Result<Request> + Send + Sync>;

/// Creates a request and applies configuration functions in order.
pub fn new_request(
    method: Method,
    url: impl Into<String>,
    body: Option<Body>,
    configs: &[ConfigureRequest],
) -> Result<Request> {
    let mut req = Request::new(method, url);
    req.body = body;
    for config in configs {
        req = config(req)?;
    }
    Ok(req)
}

/// Prefixes the request URL with a scheme, host, and base path.
///
/// The request URL is expected to be a path; the base contributes scheme,
/// authority, and any path prefix of its own.
pub fn with_base_url(base: impl Into<String>) -> ConfigureRequest {
    let base = base.into();
    Arc::new(move |mut req: Request| {
        let parsed = reqwest::Url::parse(&base)
            .map_err(|err| Error::InvalidUrl(format!("{base}: {err}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{base}: missing host")))?;
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        req.url = format!(
            "{}://{}{}{}",
            parsed.scheme(),
            authority,
            parsed.path().trim_end_matches('/'),
            req.url
        );
        Ok(req)
    })
}

/// Sets a header on the request.
pub fn with_header(name: HeaderName, value: HeaderValue) -> ConfigureRequest {
    Arc::new(move |mut req: Request| {
        req.headers.insert(name.clone(), value.clone());
        Ok(req)
    })
}

/// Sets the `Authorization` header from a bearer token.
///
/// A missing `Bearer ` prefix is added automatically.
pub fn with_bearer(token: impl Into<String>) -> ConfigureRequest {
    let authorization = normalize_bearer_authorization(&token.into());
    Arc::new(move |mut req: Request| {
        let value = HeaderValue::from_str(&authorization)
            .map_err(|err| Error::Config(format!("authorization header: {err}")))?;
        req.headers
            .insert(reqwest::header::AUTHORIZATION, value);
        Ok(req)
    })
}

/// Attaches a cancellation token to the request.
pub fn with_cancel(token: CancelToken) -> ConfigureRequest {
    Arc::new(move |mut req: Request| {
        req.cancel = Some(token.clone());
        Ok(req)
    })
}

/// Captures base configuration shared by every request it creates.
#[derive(Clone)]
pub struct RequestFactory {
    base: Vec<ConfigureRequest>,
}

impl RequestFactory {
    /// Creates a factory from base configuration functions.
    pub fn new(base: impl Into<Vec<ConfigureRequest>>) -> Self {
        Self { base: base.into() }
    }

    /// Creates a request, applying base configs before per-request configs.
    pub fn request(
        &self,
        method: Method,
        url: impl Into<String>,
        body: Option<Body>,
        configs: &[ConfigureRequest],
    ) -> Result<Request> {
        let mut req = new_request(method, url, body, &self.base)?;
        for config in configs {
            req = config(req)?;
        }
        Ok(req)
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
    use reqwest::Method;

    use super::{
        new_request, normalize_bearer_authorization, with_base_url, with_bearer, with_header,
        RequestFactory,
    };

    #[test]
    fn base_url_completes_a_path() {
        let req = new_request(
            Method::GET,
            "/orders/1",
            None,
            &[with_base_url("https://example.com")],
        )
        .expect("configure");
        assert_eq!(req.url, "https://example.com/orders/1");
    }

    #[test]
    fn base_url_keeps_port_and_path_prefix() {
        let req = new_request(
            Method::GET,
            "/orders/1",
            None,
            &[with_base_url("http://127.0.0.1:8080/api/")],
        )
        .expect("configure");
        assert_eq!(req.url, "http://127.0.0.1:8080/api/orders/1");
    }

    #[test]
    fn invalid_base_url_fails() {
        let result = new_request(Method::GET, "/orders", None, &[with_base_url("::nope::")]);
        assert!(result.is_err());
    }

    #[test]
    fn factory_applies_base_then_request_configs() {
        let factory = RequestFactory::new(vec![
            with_base_url("https://example.com"),
            with_bearer("token"),
        ]);
        let req = factory
            .request(
                Method::GET,
                "/orders/1",
                None,
                &[with_header(ACCEPT, HeaderValue::from_static("text/plain"))],
            )
            .expect("configure");

        assert_eq!(req.url, "https://example.com/orders/1");
        assert_eq!(
            req.headers.get(AUTHORIZATION),
            Some(&HeaderValue::from_static("Bearer token"))
        );
        assert_eq!(
            req.headers.get(ACCEPT),
            Some(&HeaderValue::from_static("text/plain"))
        );
    }

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(normalize_bearer_authorization("abc123"), "Bearer abc123");
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123"
        );
    }
}
