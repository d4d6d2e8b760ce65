//! Tokio codec turning a byte stream into IRC [`Message`]s.
//!
//! Framing is delegated to [`LinesCodec`]. Lines that fail to parse, and
//! lines longer than the limit, are logged and skipped so one bad line never
//! tears down the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::error::ProtocolError;
use crate::message::Message;

/// Default maximum inbound line length in bytes.
pub const DEFAULT_MAX_LINE: usize = 4096;

/// IRC message codec.
#[derive(Debug)]
pub struct IrcCodec {
    inner: LinesCodec,
}

impl IrcCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_len),
        }
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn lines_error(err: LinesCodecError) -> ProtocolError {
    match err {
        LinesCodecError::Io(e) => ProtocolError::Io(e),
        LinesCodecError::MaxLineLengthExceeded => ProtocolError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "line too long",
        )),
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        loop {
            let line = match self.inner.decode(src) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::debug!("Discarding over-long line");
                    continue;
                }
                // the bad line is already split off the buffer
                Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::debug!(error = %e, "Skipping line that is not UTF-8");
                    continue;
                }
                Err(e) => return Err(lines_error(e)),
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Message>() {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => tracing::debug!(error = %e, "Skipping unparseable line"),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None => match self.inner.decode_eof(src) {
                Ok(Some(line)) => Ok(line.parse::<Message>().ok()),
                Ok(None) => Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => Ok(None),
                Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    Ok(None)
                }
                Err(e) => Err(lines_error(e)),
            },
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = msg.to_string();
        // Display already appends CRLF; anything else would be injection.
        let body = &line[..line.len() - 2];
        if body.contains(['\r', '\n', '\0']) {
            return Err(ProtocolError::IllegalControlChar(body.to_string()));
        }
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
