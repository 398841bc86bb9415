//! Comment bodies for outgoing transfers.
//!
//! Two on-chain layouts are supported, chosen by [`CommentEncoding`]:
//!
//! - [`CommentEncoding::LegacyBase64`]: the comment is base64-encoded and the
//!   bytes of that base64 string are stored as a snake string with no op
//!   prefix. Receivers see `base64(text)`. This matches the deployed tooling
//!   and stays the default.
//! - [`CommentEncoding::Text`]: the standard text comment, a 32-bit zero op
//!   followed by the UTF-8 bytes as a snake string.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::{Cell, CellBuilder, CellError, deserialize_boc_base64, serialize_boc_base64};

/// Largest encoded comment payload accepted, in bytes.
pub const MAX_COMMENT_BYTES: usize = 4096;

const TEXT_COMMENT_OP: u32 = 0;

#[derive(Debug, Error)]
pub enum MessageBuildError {
    #[error("Comment is {len} bytes after encoding, the limit is {max}")]
    CommentTooLong { len: usize, max: usize },

    #[error("Failed to encode message cell: {0}")]
    Encoding(#[from] CellError),

    #[error("Comment is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Comment payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Not a text comment: op 0x{0:08x}")]
    UnexpectedOp(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentEncoding {
    #[default]
    LegacyBase64,
    Text,
}

impl FromStr for CommentEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy_base64" => Ok(CommentEncoding::LegacyBase64),
            "text" => Ok(CommentEncoding::Text),
            other => Err(format!("unknown comment encoding '{other}'")),
        }
    }
}

impl fmt::Display for CommentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentEncoding::LegacyBase64 => write!(f, "legacy_base64"),
            CommentEncoding::Text => write!(f, "text"),
        }
    }
}

/// A message body cell, either freshly built or taken over from history.
///
/// Not `Clone`: a body belongs to one attempt and is consumed by the broadcast.
#[derive(Debug)]
pub struct MessageBody {
    cell: Arc<Cell>,
    reused: bool,
}

impl MessageBody {
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn into_cell(self) -> Arc<Cell> {
        self.cell
    }

    /// Whether the body was taken verbatim from a previous transaction.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn to_boc_base64(&self) -> Result<String, MessageBuildError> {
        Ok(serialize_boc_base64(&self.cell)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBuilder {
    encoding: CommentEncoding,
}

impl MessageBuilder {
    pub fn new(encoding: CommentEncoding) -> Self {
        Self { encoding }
    }

    pub fn build_comment_body(&self, text: &str) -> Result<MessageBody, MessageBuildError> {
        let mut builder = CellBuilder::new();
        match self.encoding {
            CommentEncoding::LegacyBase64 => {
                let payload = STANDARD.encode(text.as_bytes());
                check_length(payload.len())?;
                builder.store_snake_bytes(payload.as_bytes())?;
            },
            CommentEncoding::Text => {
                check_length(text.len())?;
                builder.store_u32(TEXT_COMMENT_OP)?;
                builder.store_snake_bytes(text.as_bytes())?;
            },
        }

        Ok(MessageBody {
            cell: Arc::new(builder.build()?),
            reused: false,
        })
    }

    /// Recovers the comment text from a body built with the same encoding.
    pub fn decode_comment_body(&self, cell: &Cell) -> Result<String, MessageBuildError> {
        let mut slice = cell.parse();
        match self.encoding {
            CommentEncoding::LegacyBase64 => {
                let payload = slice.load_snake_bytes()?;
                let text = STANDARD.decode(&payload)?;
                Ok(String::from_utf8(text)?)
            },
            CommentEncoding::Text => {
                let op = slice.load_u32()?;
                if op != TEXT_COMMENT_OP {
                    return Err(MessageBuildError::UnexpectedOp(op));
                }
                Ok(String::from_utf8(slice.load_snake_bytes()?)?)
            },
        }
    }

    /// Takes a body BoC from transaction history and reuses its root cell as is.
    pub fn reuse_pending_body(&self, boc_base64: &str) -> Result<MessageBody, MessageBuildError> {
        Ok(MessageBody {
            cell: deserialize_boc_base64(boc_base64)?,
            reused: true,
        })
    }
}

fn check_length(len: usize) -> Result<(), MessageBuildError> {
    if len > MAX_COMMENT_BYTES {
        return Err(MessageBuildError::CommentTooLong {
            len,
            max: MAX_COMMENT_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_base64_roundtrip() {
        let builder = MessageBuilder::new(CommentEncoding::LegacyBase64);
        let body = builder.build_comment_body("hello").unwrap();

        // on-chain payload is base64("hello"), no op prefix
        assert_eq!(body.cell().data(), b"aGVsbG8=");
        assert_eq!(builder.decode_comment_body(body.cell()).unwrap(), "hello");
    }

    #[test]
    fn test_text_roundtrip() {
        let builder = MessageBuilder::new(CommentEncoding::Text);
        let body = builder.build_comment_body("Sending TON").unwrap();

        assert_eq!(&body.cell().data()[..4], &[0, 0, 0, 0]);
        assert_eq!(builder.decode_comment_body(body.cell()).unwrap(), "Sending TON");
    }

    #[test]
    fn test_long_comment_spans_cells() {
        let text = "ж".repeat(600);
        for encoding in [CommentEncoding::LegacyBase64, CommentEncoding::Text] {
            let builder = MessageBuilder::new(encoding);
            let body = builder.build_comment_body(&text).unwrap();
            assert!(!body.cell().references().is_empty());
            assert_eq!(builder.decode_comment_body(body.cell()).unwrap(), text);
        }
    }

    #[test]
    fn test_oversized_comment_is_rejected() {
        // 3100 bytes of text become 4136 base64 characters
        let text = "a".repeat(3100);
        let err = MessageBuilder::new(CommentEncoding::LegacyBase64)
            .build_comment_body(&text)
            .unwrap_err();
        assert!(matches!(err, MessageBuildError::CommentTooLong { len: 4136, max: MAX_COMMENT_BYTES }));

        assert!(MessageBuilder::new(CommentEncoding::Text).build_comment_body(&text).is_ok());
    }

    #[test]
    fn test_decoding_with_wrong_policy_fails() {
        let text_body = MessageBuilder::new(CommentEncoding::Text)
            .build_comment_body("hi")
            .unwrap();
        assert!(
            MessageBuilder::new(CommentEncoding::LegacyBase64)
                .decode_comment_body(text_body.cell())
                .is_err()
        );

        let legacy_body = MessageBuilder::new(CommentEncoding::LegacyBase64)
            .build_comment_body("hi")
            .unwrap();
        assert!(matches!(
            MessageBuilder::new(CommentEncoding::Text).decode_comment_body(legacy_body.cell()),
            Err(MessageBuildError::UnexpectedOp(_))
        ));
    }

    #[test]
    fn test_reuse_keeps_root_cell_verbatim() {
        let original = MessageBuilder::default().build_comment_body("pending").unwrap();
        let boc = original.to_boc_base64().unwrap();

        let reused = MessageBuilder::new(CommentEncoding::Text).reuse_pending_body(&boc).unwrap();
        assert!(reused.is_reused());
        assert_eq!(reused.cell().hash(), original.cell().hash());
    }

    #[test]
    fn test_reuse_rejects_garbage() {
        assert!(matches!(
            MessageBuilder::default().reuse_pending_body("!!not base64!!"),
            Err(MessageBuildError::Encoding(CellError::InvalidBase64(_)))
        ));
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("legacy_base64".parse::<CommentEncoding>(), Ok(CommentEncoding::LegacyBase64));
        assert_eq!("TEXT".parse::<CommentEncoding>(), Ok(CommentEncoding::Text));
        assert!("rot13".parse::<CommentEncoding>().is_err());
    }
}
