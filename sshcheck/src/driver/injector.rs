//! Password injection on a detected prompt.
//!
//! The master is read one byte per `read` call. A larger read could swallow
//! output that follows the prompt (the echoed newline, the first progress
//! line) and that output belongs to the drain, not to the prompt scan.

use std::io::{ErrorKind, Read, Write};

use log::{debug, trace};
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{PromptBuffer, PromptPattern};
use crate::error::ChannelError;

/// Read from `reader` until `pattern` is a suffix of everything read, then
/// write `secret` and a newline to `writer`.
///
/// Returns the bytes read up to and including the prompt.
///
/// # Errors
///
/// - [`ChannelError::PromptNotFound`] if the reader hits end-of-stream first
/// - [`ChannelError::PromptBufferExceeded`] if more than `limit` bytes arrive
///   without a prompt
/// - [`ChannelError::Transport`] on any read or write failure
pub fn inject_on_prompt<R, W>(
    reader: &mut R,
    writer: &mut W,
    pattern: &PromptPattern,
    secret: &SecretString,
    limit: usize,
) -> Result<Vec<u8>, ChannelError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = PromptBuffer::new(limit);
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                debug!(
                    "end of output after {} bytes without prompt {:?}",
                    buffer.len(),
                    pattern.to_string()
                );
                return Err(ChannelError::PromptNotFound {
                    pattern: pattern.to_string(),
                    bytes_read: buffer.len(),
                });
            }
            Ok(_) => {
                if buffer.push(byte[0], pattern)? {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChannelError::Transport(e)),
        }
    }

    trace!("prompt matched after {} bytes", buffer.len());

    let secret = secret.expose_secret();
    let mut line = Vec::with_capacity(secret.len() + 1);
    line.extend_from_slice(secret.as_bytes());
    line.push(b'\n');
    let written = writer.write_all(&line).and_then(|_| writer.flush());
    line.fill(0);
    written?;

    debug!("credential sent");
    Ok(buffer.take())
}
