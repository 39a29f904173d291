//! Replaying a dump log against a new target.

use crate::{
    configuration::{FailurePolicy, ReplayConfiguration},
    data::{self, ErrorRecord, Exchange},
    dump_log::{LogReader, LogWriter},
    error::Error,
    http_client::HttpClient,
    util,
};
use hyper::{
    body,
    header::{HeaderValue, HOST},
    Body, Request, Uri,
};
use std::{
    fmt::Display,
    io::{BufRead, Write},
    sync::Arc,
};
use tracing::{error, info, warn};

/// Rebuilds a recorded request so it's sent to `target` instead of the recorded host.
pub fn reconstruct(stored: &data::Request, target: &str) -> Result<Request<Body>, Error> {
    if !stored.url.is_empty() && !stored.url.starts_with('/') {
        return Err(Error::NonRelativeUrl(stored.url.clone()));
    }

    let url = format!("{}{}", target.trim_end_matches('/'), stored.url);
    let uri: Uri = url.parse()?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::InvalidTarget(String::from(target)));
    }

    let mut request_builder = Request::builder().method(stored.method.as_str()).uri(uri);
    if let Some(headers_mut) = request_builder.headers_mut() {
        util::apply_headers(
            headers_mut,
            stored
                .header
                .iter()
                .filter(|(header_name, _)| !header_name.eq_ignore_ascii_case("host")),
        )?;
    }

    Ok(request_builder.body(Body::from(stored.body.clone()))?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    Status {
        expected: String,
        actual: String,
    },
    Body {
        expected_len: usize,
        actual_len: usize,
        /// Offset of the first byte that differs.
        offset: usize,
    },
}

impl Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Divergence::Status { expected, actual } => {
                write!(f, "{} is expected, but {} is got", expected, actual)
            }
            Divergence::Body {
                expected_len,
                actual_len,
                offset,
            } => write!(
                f,
                "Response body does not equal the expected one: {} bytes expected, {} bytes got, first difference at byte {}",
                expected_len, actual_len, offset
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    divergences: Vec<Divergence>,
}

impl Verification {
    pub fn matched(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn divergences(&self) -> &[Divergence] {
        &self.divergences
    }
}

/// Compares a replayed response with the recorded one.
///
/// Only the status line and the body take part; header drift such as `Date` is expected.
pub fn verify(actual: &data::Response, expected: &data::Response) -> Verification {
    let mut divergences = Vec::new();

    if actual.status != expected.status {
        divergences.push(Divergence::Status {
            expected: expected.status.clone(),
            actual: actual.status.clone(),
        });
    }

    if actual.body != expected.body {
        let offset = actual
            .body
            .iter()
            .zip(expected.body.iter())
            .position(|(a, e)| a != e)
            .unwrap_or_else(|| actual.body.len().min(expected.body.len()));
        divergences.push(Divergence::Body {
            expected_len: expected.body.len(),
            actual_len: actual.body.len(),
            offset,
        });
    }

    Verification { divergences }
}

#[derive(Debug)]
pub enum ItemOutcome {
    Matched,
    Diverged(Verification),
    /// The exchange couldn't be replayed at all.
    Failed(Error),
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub replayed: usize,
    pub divergent: usize,
    pub failed: usize,
}

impl Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} errors reported", self.divergent, self.replayed)?;
        if self.failed > 0 {
            write!(f, ", {} exchanges couldn't be replayed", self.failed)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Replayer {
    target: String,
    client: Arc<dyn HttpClient + Send + Sync>,
    failure_policy: FailurePolicy,
    preserve_host: bool,
}

impl Replayer {
    pub fn new<S: Into<String>>(target: S, client: Arc<dyn HttpClient + Send + Sync>) -> Self {
        Self {
            target: target.into(),
            client,
            failure_policy: FailurePolicy::default(),
            preserve_host: false,
        }
    }

    pub fn from_configuration(configuration: &ReplayConfiguration) -> Result<Self, Error> {
        Ok(Self::new(configuration.target()?, configuration.http_client())
            .with_failure_policy(configuration.failure_policy())
            .with_preserve_host(configuration.preserve_host()))
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_preserve_host(mut self, preserve_host: bool) -> Self {
        self.preserve_host = preserve_host;
        self
    }

    /// Replays every line of `lines` in order and reports divergences to `errors`.
    ///
    /// Read and error-log write failures always stop the run; the failure policy decides
    /// about exchanges that can't be parsed, built or sent.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        lines: LogReader<R>,
        errors: &LogWriter<W>,
    ) -> Result<ReplaySummary, Error> {
        let mut summary = ReplaySummary::default();

        for line in lines {
            let line = line?;
            let outcome = match Exchange::from_line(&line.bytes) {
                Ok(exchange) => self.replay(exchange, errors).await?,
                Err(e) => ItemOutcome::Failed(Error::MalformedLine(line.number, e)),
            };

            match outcome {
                ItemOutcome::Matched => summary.replayed += 1,
                ItemOutcome::Diverged(_) => {
                    summary.replayed += 1;
                    summary.divergent += 1;
                }
                ItemOutcome::Failed(e) => match self.failure_policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        error!(line = line.number, error = %e, "Skipping exchange");
                        summary.failed += 1;
                    }
                },
            }
        }

        info!(
            replayed = summary.replayed,
            divergent = summary.divergent,
            failed = summary.failed,
            "All requests have done"
        );

        Ok(summary)
    }

    /// Replays one exchange; only a failure to write the error log is returned as `Err`.
    pub async fn replay<W: Write>(
        &self,
        exchange: Exchange,
        errors: &LogWriter<W>,
    ) -> Result<ItemOutcome, Error> {
        let actual = match self.send(&exchange.request).await {
            Ok(actual) => actual,
            Err(e) => return Ok(ItemOutcome::Failed(e)),
        };

        let verification = verify(&actual, &exchange.response);
        if verification.matched() {
            return Ok(ItemOutcome::Matched);
        }

        for divergence in verification.divergences() {
            match divergence {
                Divergence::Status { .. } => warn!(url = %exchange.request.url, "Bad status: {}", divergence),
                Divergence::Body { .. } => warn!(url = %exchange.request.url, "Bad response: {}", divergence),
            }
        }

        errors.append(&ErrorRecord {
            request: exchange.request,
            response: actual,
            expected: exchange.response,
        })?;

        Ok(ItemOutcome::Diverged(verification))
    }

    async fn send(&self, stored: &data::Request) -> Result<data::Response, Error> {
        let mut request = reconstruct(stored, &self.target)?;
        if self.preserve_host {
            request
                .headers_mut()
                .insert(HOST, HeaderValue::from_str(&stored.host)?);
        }
        info!(method = %request.method(), url = %request.uri(), "Replaying request");

        let response = self.client.send(request).await?;
        let (parts, body) = response.into_parts();
        let body = body::to_bytes(body).await.map_err(Error::InvalidBody)?;

        Ok(data::Response {
            status: util::status_line(parts.status),
            proto: util::protocol(parts.version),
            header: util::normalize_headers(&parts.headers),
            body: body.to_vec(),
        })
    }
}

/// Replays the configured dump log, recreating the error log for this run.
pub async fn run_replay(configuration: &ReplayConfiguration) -> Result<ReplaySummary, Error> {
    let replayer = Replayer::from_configuration(configuration)?;
    let lines = LogReader::open(configuration.dump_path())?;
    let errors = LogWriter::create(configuration.error_log_path())?;

    replayer.run(lines, &errors).await
}

/// Blocking flavour of [`run_replay`] for callers without a runtime, such as plain tests.
pub fn replay_blocking(configuration: ReplayConfiguration) -> Result<ReplaySummary, Error> {
    tokio::runtime::Runtime::new()?.block_on(run_replay(&configuration))
}
