use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::{
    languages::{finish, LanguageHandler},
    normalize::RawExecution,
    types::{ExecutionResult, FailureKind, LanguageDescriptor, Validation},
};

const OPERATIONS: [&str; 8] = [
    "base64 encode",
    "base64 decode",
    "url encode",
    "url decode",
    "hex encode",
    "hex decode",
    "json format",
    "data url",
];

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{kind} decode error: decoded bytes are not valid UTF-8 ({source})")]
    Utf8 {
        kind: &'static str,
        source: std::string::FromUtf8Error,
    },

    #[error("JSON format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One text transform, selected by the first line of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingOperation {
    Base64Encode,
    Base64Decode,
    UrlEncode,
    UrlDecode,
    HexEncode,
    HexDecode,
    JsonFormat,
    /// `data url`, with `image` or `html` anywhere on the line picking the MIME type
    DataUrl { mime_type: &'static str },
}

impl EncodingOperation {
    /// Case-insensitive prefix match on a selector line
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim().to_lowercase();
        let op = if line.starts_with("base64 encode") {
            Self::Base64Encode
        } else if line.starts_with("base64 decode") {
            Self::Base64Decode
        } else if line.starts_with("url encode") {
            Self::UrlEncode
        } else if line.starts_with("url decode") {
            Self::UrlDecode
        } else if line.starts_with("hex encode") {
            Self::HexEncode
        } else if line.starts_with("hex decode") {
            Self::HexDecode
        } else if line.starts_with("json format") {
            Self::JsonFormat
        } else if line.starts_with("data url") {
            let mime_type = if line.contains("image") {
                "image/png"
            } else if line.contains("html") {
                "text/html"
            } else {
                "text/plain"
            };
            Self::DataUrl { mime_type }
        } else {
            return None;
        };
        Some(op)
    }

    /// Heading printed above the transformed text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Base64Encode => "Base64 Encoded",
            Self::Base64Decode => "Base64 Decoded",
            Self::UrlEncode => "URL Encoded",
            Self::UrlDecode => "URL Decoded",
            Self::HexEncode => "Hex Encoded",
            Self::HexDecode => "Hex Decoded",
            Self::JsonFormat => "JSON Formatted",
            Self::DataUrl { .. } => "Data URL",
        }
    }

    pub fn apply(&self, data: &str) -> Result<String, EncodingError> {
        match self {
            Self::Base64Encode => Ok(STANDARD.encode(data.as_bytes())),
            Self::Base64Decode => {
                let bytes = STANDARD.decode(strip_whitespace(data))?;
                String::from_utf8(bytes).map_err(|source| EncodingError::Utf8 {
                    kind: "Base64",
                    source,
                })
            }
            // Keep '/' literal, as form-less URL quoting does.
            Self::UrlEncode => Ok(urlencoding::encode(data).replace("%2F", "/")),
            Self::UrlDecode => {
                let bytes = urlencoding::decode_binary(data.as_bytes());
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Self::HexEncode => Ok(hex::encode(data.as_bytes())),
            Self::HexDecode => {
                let bytes = hex::decode(strip_whitespace(data))?;
                String::from_utf8(bytes).map_err(|source| EncodingError::Utf8 {
                    kind: "Hex",
                    source,
                })
            }
            Self::JsonFormat => {
                let value: serde_json::Value = serde_json::from_str(data)?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
            Self::DataUrl { mime_type } => Ok(format!(
                "data:{};base64,{}",
                mime_type,
                STANDARD.encode(data.as_bytes())
            )),
        }
    }
}

fn strip_whitespace(data: &str) -> String {
    data.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Built-in pseudo-language for text transforms; never spawns a process
#[derive(Debug, Clone, Default)]
pub struct EncodingHandler;

impl EncodingHandler {
    pub fn new() -> Self {
        Self
    }

    fn split(source: &str) -> (&str, &str) {
        let source = source.trim();
        match source.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (source, ""),
        }
    }

    fn run(&self, source: &str, started: Instant) -> RawExecution {
        let (selector, data) = Self::split(source);
        let Some(operation) = EncodingOperation::parse(selector) else {
            return RawExecution::failed(
                FailureKind::InternalError,
                format!(
                    "Unknown operation: {}\nAvailable operations: {}",
                    selector.trim().to_lowercase(),
                    OPERATIONS.join(", ")
                ),
            );
        };

        debug!("Encoding operation: {:?}", operation);
        match operation.apply(data) {
            Ok(result) => {
                RawExecution::timed(format!("{}:\n{}", operation.label(), result), started.elapsed())
            }
            Err(e) => RawExecution::failed(FailureKind::InternalError, e.to_string()),
        }
    }
}

#[async_trait]
impl LanguageHandler for EncodingHandler {
    async fn validate(&self, source: &str) -> Validation {
        let (selector, _) = Self::split(source);
        if selector.trim().is_empty() {
            return Validation::invalid("No operation specified");
        }
        match EncodingOperation::parse(selector) {
            Some(_) => Validation::valid(),
            None => Validation::invalid(format!(
                "Invalid operation. Available: {}",
                OPERATIONS.join(", ")
            )),
        }
    }

    async fn execute(&self, source: &str, _stdin: Option<&str>) -> ExecutionResult {
        let started = Instant::now();
        if source.trim().is_empty() {
            return finish(
                "encoding",
                Ok(RawExecution::failed(
                    FailureKind::InternalError,
                    "No operation specified",
                )),
                started,
            );
        }
        finish("encoding", Ok(self.run(source, started)), started)
    }

    fn describe(&self) -> LanguageDescriptor {
        LanguageDescriptor::new("Encoding/Decoding", "Built-in", ".txt", "plaintext")
    }
}
