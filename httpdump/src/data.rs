use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Single-valued reduction of an HTTP header collection.
///
/// Only the first value of a repeated header survives, and replay comparisons are
/// defined against this reduced form.
pub type HeaderMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    /// Path and query only, e.g. `/hello?name=x`.
    pub url: String,
    pub proto: String,
    pub host: String,
    pub header: HeaderMap,
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status code followed by the reason phrase, e.g. `200 OK`.
    pub status: String,
    pub proto: String,
    pub header: HeaderMap,
    #[serde(with = "base64_body")]
    pub body: Vec<u8>,
}

/// One line of the dump log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub request: Request,
    pub response: Response,
}

/// One line of the error log, written for every divergent replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub request: Request,
    /// The response the replay target actually sent.
    pub response: Response,
    pub expected: Response,
}

impl Exchange {
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }
}

mod base64_body {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        // bodies recorded without content may be written as null
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
