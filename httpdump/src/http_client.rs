use crate::error::Error;
use async_trait::async_trait;
use hyper::{client::HttpConnector, Body, Client, Request, Response};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

/// Sends a fully built request and hands back the response with its body unread.
#[async_trait]
pub trait HttpClient: Debug {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, Error>;
}

#[derive(Debug, Clone)]
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        Ok(self.client.request(request).await?)
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
