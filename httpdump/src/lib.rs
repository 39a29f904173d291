mod configuration;
mod data;
mod dump_log;
mod error;
mod http_client;
mod recorder;
mod replay;
mod runner;
mod util;

pub use configuration::{FailurePolicy, RecorderConfiguration, ReplayConfiguration};
pub use data::{ErrorRecord, Exchange, HeaderMap, Request, Response};
pub use dump_log::{Line, LogReader, LogWriter};
pub use error::Error;
pub use http_client::{HttpClient, HyperHttpClient};
pub use httpdump_codegen::replay_test;
pub use recorder::Recorder;
pub use replay::{
    reconstruct, replay_blocking, run_replay, verify, Divergence, ItemOutcome, ReplaySummary,
    Replayer, Verification,
};
pub use runner::{run_recorder, serve};
pub use util::normalize_headers;
