use crate::{
    error::Error,
    http_client::{HttpClient, HyperHttpClient},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:5000";
pub const DEFAULT_DUMP_PATH: &str = "httpdump.json";
pub const DEFAULT_ERROR_LOG_PATH: &str = "errorlog.json";

/// What the replayer does with an exchange that can't be replayed at all.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailurePolicy {
    /// Stop the run and report the error.
    Abort,
    /// Count the exchange as failed and move on to the next one.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Abort
    }
}

#[derive(Debug)]
pub struct RecorderConfiguration {
    backend: String,
    listen_address: String,
    dump_path: PathBuf,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl RecorderConfiguration {
    pub fn new<S: Into<String>>(backend: S) -> Self {
        Self {
            backend: backend.into(),
            listen_address: String::from(DEFAULT_LISTEN_ADDRESS),
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
            http_client: None,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn set_listen_address<S: Into<String>>(&mut self, listen_address: S) {
        self.listen_address = listen_address.into();
    }

    pub fn listen_address(&self) -> &str {
        &self.listen_address
    }

    pub fn set_dump_path<P: Into<PathBuf>>(&mut self, dump_path: P) {
        self.dump_path = dump_path.into();
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }
}

#[derive(Debug)]
pub struct ReplayConfiguration {
    dump_path: PathBuf,
    target: Option<String>,
    error_log_path: PathBuf,
    failure_policy: FailurePolicy,
    preserve_host: bool,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl ReplayConfiguration {
    pub fn new<P: Into<PathBuf>>(dump_path: P) -> Self {
        Self {
            dump_path: dump_path.into(),
            target: None,
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG_PATH),
            failure_policy: FailurePolicy::default(),
            preserve_host: false,
            http_client: None,
        }
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    pub fn set_target<S: Into<String>>(&mut self, target: S) {
        self.target = Some(target.into());
    }

    pub fn target(&self) -> Result<&str, Error> {
        self.target
            .as_deref()
            .ok_or(Error::NotConfigured("target"))
    }

    pub fn set_error_log_path<P: Into<PathBuf>>(&mut self, error_log_path: P) {
        self.error_log_path = error_log_path.into();
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log_path
    }

    pub fn set_failure_policy(&mut self, failure_policy: FailurePolicy) {
        self.failure_policy = failure_policy;
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Send the recorded `host` as the `Host` header instead of the target's authority.
    pub fn set_preserve_host(&mut self, value: bool) {
        self.preserve_host = value;
    }

    pub fn preserve_host(&self) -> bool {
        self.preserve_host
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }
}
