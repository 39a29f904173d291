//! Recording reverse proxy.
//!
//! Every request is buffered, forwarded to the backend, and the backend's reply is
//! buffered as well before being handed back to the caller. Once the reply is complete
//! the pair is appended to the dump log as one line.

use crate::{
    configuration::RecorderConfiguration,
    data::{self, Exchange},
    dump_log::LogWriter,
    error::Error,
    http_client::HttpClient,
    util,
};
use hyper::{body, Body, Request, Response, StatusCode, Uri, Version};
use std::{fs::File, io::BufWriter, io::Write, sync::Arc};
use tracing::{debug, error};

#[derive(Debug)]
pub struct Recorder<W: Write> {
    backend: Uri,
    client: Arc<dyn HttpClient + Send + Sync>,
    dump: LogWriter<W>,
}

impl Recorder<BufWriter<File>> {
    pub fn from_configuration(configuration: &RecorderConfiguration) -> Result<Self, Error> {
        Self::new(
            configuration.backend(),
            configuration.http_client(),
            LogWriter::append_to(configuration.dump_path())?,
        )
    }
}

impl<W: Write> Recorder<W> {
    pub fn new(
        backend: &str,
        client: Arc<dyn HttpClient + Send + Sync>,
        dump: LogWriter<W>,
    ) -> Result<Self, Error> {
        let backend: Uri = backend.parse()?;
        if backend.scheme().is_none() || backend.authority().is_none() {
            return Err(Error::InvalidTarget(backend.to_string()));
        }

        Ok(Self {
            backend,
            client,
            dump,
        })
    }

    pub fn backend(&self) -> &Uri {
        &self.backend
    }

    /// Proxies one request and records it; failures turn into `502 Bad Gateway`.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        match self.record(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %uri, error = %e, "Couldn't proxy and record the exchange");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::BAD_GATEWAY;
                response
            }
        }
    }

    async fn record(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        let (forwardable, captured) = self.on_request(request).await?;
        let response = self.forward(forwardable).await?;
        self.on_response(response, captured).await
    }

    /// Buffers the request body and captures the request.
    ///
    /// The returned request carries the same bytes in a fresh body and is otherwise
    /// untouched, so it can be forwarded as is.
    pub async fn on_request(
        &self,
        request: Request<Body>,
    ) -> Result<(Request<Body>, data::Request), Error> {
        let (parts, body) = request.into_parts();
        let body = body::to_bytes(body).await.map_err(Error::InvalidBody)?;

        let mut header = util::normalize_headers(&parts.headers);
        let host_header = header.remove("host");
        let host = parts
            .uri
            .authority()
            .map(|authority| authority.to_string())
            .or(host_header)
            .unwrap_or_default();

        let captured = data::Request {
            method: parts.method.to_string(),
            url: parts
                .uri
                .path_and_query()
                .map(|path_and_query| path_and_query.to_string())
                .unwrap_or_default(),
            proto: util::protocol(parts.version),
            host,
            header,
            body: body.to_vec(),
        };

        Ok((Request::from_parts(parts, Body::from(body)), captured))
    }

    /// Sends the request to the backend and returns its reply with the body unread.
    pub async fn forward(&self, mut request: Request<Body>) -> Result<Response<Body>, Error> {
        *request.uri_mut() = backend_uri(&self.backend, request.uri())?;
        *request.version_mut() = Version::HTTP_11;
        util::remove_hop_by_hop_headers(request.headers_mut());

        let mut response = self.client.send(request).await?;
        util::remove_hop_by_hop_headers(response.headers_mut());

        Ok(response)
    }

    /// Buffers the backend's reply, appends the exchange to the dump log and returns the
    /// reply with a fresh body over the same bytes.
    pub async fn on_response(
        &self,
        response: Response<Body>,
        captured: data::Request,
    ) -> Result<Response<Body>, Error> {
        let (parts, body) = response.into_parts();
        let body = body::to_bytes(body).await.map_err(Error::InvalidBody)?;

        let exchange = Exchange {
            request: captured,
            response: data::Response {
                status: util::status_line(parts.status),
                proto: util::protocol(parts.version),
                header: util::normalize_headers(&parts.headers),
                body: body.to_vec(),
            },
        };
        self.dump.append(&exchange)?;

        debug!(
            method = %exchange.request.method,
            url = %exchange.request.url,
            status = %exchange.response.status,
            "Exchange recorded"
        );

        Ok(Response::from_parts(parts, Body::from(body)))
    }
}

/// Moves `incoming` onto the backend: the backend's path is used as a prefix and both
/// queries are kept.
fn backend_uri(backend: &Uri, incoming: &Uri) -> Result<Uri, Error> {
    let mut path_and_query = join_paths(backend.path(), incoming.path());
    let query = match (backend.query().unwrap_or(""), incoming.query().unwrap_or("")) {
        ("", query) | (query, "") => String::from(query),
        (backend_query, incoming_query) => format!("{}&{}", backend_query, incoming_query),
    };
    if !query.is_empty() {
        path_and_query.push('?');
        path_and_query.push_str(&query);
    }

    let mut builder = Uri::builder().path_and_query(path_and_query.as_str());
    if let Some(scheme) = backend.scheme_str() {
        builder = builder.scheme(scheme);
    }
    if let Some(authority) = backend.authority() {
        builder = builder.authority(authority.as_str());
    }

    Ok(builder.build()?)
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
