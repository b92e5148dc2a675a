//! Strict JSON request bodies


use actix_web::web::Payload;
use bytes::BytesMut;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::{Error, Result};


/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 1_048_576;


/// Reads and decodes a request body
///
/// Bodies larger than `MAX_BODY_BYTES` are rejected without being buffered in
/// full. See `decode` for the decoding rules.
pub async fn read<T: DeserializeOwned>(mut payload: Payload) -> Result<T> {

    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|err| Error::BadRequest(format!("body could not be read: {}", err)))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(Error::BadRequest(
                format!("body must not be larger than {} bytes", MAX_BODY_BYTES)
            ));
        }
        body.extend_from_slice(&chunk);
    }

    decode(&body)
}


/// Decodes exactly one JSON value from `body`
///
/// Failures are reported as `Error::BadRequest` with a message suitable for
/// returning to the client. Unknown fields are only rejected if `T` denies
/// them (`#[serde(deny_unknown_fields)]`).
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::BadRequest(String::from("body must not be empty")));
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let value = T::deserialize(&mut de)
        .map_err(describe)?;

    de.end()
        .map_err(|_| Error::BadRequest(String::from("body must only contain a single JSON value")))?;

    Ok(value)
}


fn describe(err: serde_json::Error) -> Error {

    let message = match err.classify() {
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {}, column {})",
            err.line(), err.column(),
        ),
        Category::Eof => String::from("body contains badly-formed JSON"),
        Category::Io => String::from("body could not be read"),
        Category::Data => {
            let text = err.to_string();
            if let Some(field) = unknown_field(&text) {
                format!("body contains unknown key \"{}\"", field)
            } else if text.starts_with("invalid type") {
                format!(
                    "body contains incorrect JSON type (at line {}, column {})",
                    err.line(), err.column(),
                )
            } else {
                format!("body contains invalid data ({})", text)
            }
        },
    };

    Error::BadRequest(message)
}


/// Extracts the field name from serde's "unknown field `x`, expected ..." message
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    let end = rest.find('`')?;
    Some(&rest[..end])
}
