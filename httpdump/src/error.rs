use hyper::http;
use std::{fmt::Display, io, sync};

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    JsonError(serde_json::Error),
    MalformedLine(usize, serde_json::Error),
    PoisonedLock,
    NotConfigured(&'static str),
    InvalidHeaderName,
    InvalidHeaderValue,
    InvalidBody(hyper::Error),
    HyperError(hyper::Error),
    ParseUriError(http::uri::InvalidUri),
    NonRelativeUrl(String),
    InvalidTarget(String),
    HttpError(http::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::JsonError(e) | Error::MalformedLine(_, e) => Some(e),
            Error::InvalidBody(e) | Error::HyperError(e) => Some(e),
            Error::ParseUriError(e) => Some(e),
            Error::HttpError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IoError: {}", e),
            Error::JsonError(e) => write!(f, "Json error: {}", e),
            Error::MalformedLine(line, e) => {
                write!(f, "Malformed dump log line {}: {}", line, e)
            }
            Error::PoisonedLock => write!(f, "The lock was poisoned"),
            Error::NotConfigured(setting) => write!(f, "`{}` hasn't been configured", setting),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::InvalidBody(e) => write!(f, "Couldn't read the body: {}", e),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::ParseUriError(e) => write!(f, "Parse URI Error: {}", e),
            Error::NonRelativeUrl(url) => write!(
                f,
                "The recorded url \"{}\" is not host-relative and can't be moved to a new target",
                url
            ),
            Error::InvalidTarget(url) => write!(
                f,
                "\"{}\" should be an absolute url with a scheme and a host",
                url
            ),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::JsonError(e)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(e: http::uri::InvalidUri) -> Self {
        Error::ParseUriError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}
