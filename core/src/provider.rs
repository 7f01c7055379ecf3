//! Blocking HTTP connections backed by `ureq`.
//!
//! Status codes of 400 and above are returned as data rather than as
//! `ureq::Error`, so the transport decides which callback branch runs.
//! Bodies are read without a size cap and decoded lossily, so once a status
//! line has arrived only a broken stream can keep it from a callback.

use ureq::http::{Response, Uri};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpResponse};
use crate::transport::{ConnectOptions, Connection, Provider};

/// The standard provider. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqProvider;

impl Provider for UreqProvider {
    fn name(&self) -> &str {
        "ureq"
    }

    fn create(&self, options: &ConnectOptions) -> Option<Box<dyn Connection>> {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(options.timeout)
            .build()
            .new_agent();
        Some(Box::new(UreqConnection {
            agent,
            target: None,
            headers: Vec::new(),
        }))
    }
}

struct UreqConnection {
    agent: Agent,
    target: Option<(HttpMethod, String)>,
    headers: Vec<(String, String)>,
}

impl Connection for UreqConnection {
    fn open(&mut self, method: HttpMethod, url: &str, _asynchronous: bool) -> Result<(), TransportError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| TransportError::InvalidUrl(url.to_string()))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }
        self.target = Some((method, url.to_string()));
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(self: Box<Self>, body: &str) -> Result<HttpResponse, TransportError> {
        let UreqConnection { agent, target, headers } = *self;
        let (method, url) = target.ok_or_else(|| TransportError::InvalidUrl("connection was never opened".to_string()))?;

        let result = match method {
            HttpMethod::Get => with_headers(agent.get(&url), &headers).call(),
            HttpMethod::Head => with_headers(agent.head(&url), &headers).call(),
            HttpMethod::Delete if body.is_empty() => with_headers(agent.delete(&url), &headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(&url), &headers)
                .force_send_body()
                .send(body.as_bytes()),
            HttpMethod::Post => with_headers(agent.post(&url), &headers).send(body.as_bytes()),
            HttpMethod::Put => with_headers(agent.put(&url), &headers).send(body.as_bytes()),
        };

        result.map_err(map_error).and_then(into_response)
    }
}

fn with_headers<B>(mut request: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

fn into_response(mut response: Response<Body>) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let bytes = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(map_error)?;
    let body = String::from_utf8_lossy(&bytes).into_owned();
    Ok(HttpResponse { status, headers, body })
}

fn map_error(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}
