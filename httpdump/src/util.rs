use crate::{data::HeaderMap, error::Error};
use hyper::{
    header::{self, HeaderName, HeaderValue},
    StatusCode, Version,
};

/// Headers that describe a single connection and are never forwarded by a proxy.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Reduces a native header collection to one value per name.
///
/// The first value of a repeated header wins, the same value `HeaderMap::get` returns.
/// Values with opaque bytes are converted lossily instead of being dropped.
pub fn normalize_headers(header_map: &hyper::HeaderMap) -> HeaderMap {
    header_map
        .keys()
        .filter_map(|name| {
            header_map.get(name).map(|value| {
                (
                    String::from(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
        })
        .collect()
}

/// Sets every header onto `header_map`, replacing whatever value it already had.
pub fn apply_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut hyper::HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_bytes(key.as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.insert(header_name, header_value);
    }

    Ok(())
}

pub fn remove_hop_by_hop_headers(header_map: &mut hyper::HeaderMap) {
    let listed: Vec<HeaderName> = header_map
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        header_map.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        header_map.remove(*name);
    }
}

/// Formats a status the way it appears on the status line, e.g. `404 Not Found`.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => String::from(status.as_str()),
    }
}

pub fn protocol(version: Version) -> String {
    format!("{:?}", version)
}
