//! Purpose: Provide the runtime JSON decode/encode entrypoints for transcoding paths.
//! Exports: `from_slice`, `to_bytes`, `decode_error`, `encode_error`.
//! Role: Parser boundary so hooks map serde failures onto one error taxonomy.
//! Invariants: Decode failures become `ErrorKind::Decode`; encode failures `ErrorKind::Encode`.
//! Invariants: Callers supply the human-readable message so domain context stays explicit.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{Error, ErrorKind};

pub(crate) fn from_slice<T: DeserializeOwned>(input: &[u8], message: &str) -> Result<T, Error> {
    serde_json::from_slice(input).map_err(|err| decode_error(err, message))
}

pub(crate) fn to_bytes<T: Serialize + ?Sized>(value: &T, message: &str) -> Result<Bytes, Error> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| encode_error(err, message))
}

pub(crate) fn decode_error(err: serde_json::Error, message: &str) -> Error {
    Error::new(ErrorKind::Decode)
        .with_message(message)
        .with_hint(hint_for_error(&err))
        .with_source(err)
}

pub(crate) fn encode_error(err: serde_json::Error, message: &str) -> Error {
    Error::new(ErrorKind::Encode)
        .with_message(message)
        .with_source(err)
}

fn hint_for_error(err: &serde_json::Error) -> String {
    let category = match err.classify() {
        serde_json::error::Category::Io => "io",
        serde_json::error::Category::Syntax => "syntax",
        serde_json::error::Category::Data => "shape",
        serde_json::error::Category::Eof => "truncated",
    };
    format!(
        "parse category: {category} (line {}, column {})",
        err.line(),
        err.column()
    )
}
