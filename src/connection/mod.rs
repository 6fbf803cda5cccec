//! Connection layer
//!
//! A [`Display`] owns the byte stream to the X server and serializes access
//! to it. Multi-part requests are written while holding a [`RequestGuard`],
//! so no other request can be interleaved between a header and its body.

mod transport;

pub use transport::Transport;

use crate::protocol::*;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

/// Largest request length, in 4-byte words, without BIG-REQUESTS
pub const DEFAULT_MAX_REQUEST_LENGTH: usize = u16::MAX as usize;

/// Codes assigned to an extension by the server
///
/// Event and error bases are not needed to encode requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub major_opcode: u8,
}

struct DisplayState<S> {
    stream: S,
    /// Sequence number of the last request written
    last_request: u64,
    synchronous: bool,
}

/// Client side of an established X11 connection
pub struct Display<S: Write> {
    state: Mutex<DisplayState<S>>,
    byte_order: ByteOrder,
    xinput: Option<ExtensionInfo>,
    max_request_length: usize,
}

fn poisoned() -> Error {
    Error::Transmission(io::Error::new(
        io::ErrorKind::Other,
        "display lock poisoned by a panicking request",
    ))
}

impl<S: Write> Display<S> {
    /// Wrap a stream that has completed connection setup.
    ///
    /// `xinput` carries the codes of XInputExtension as negotiated by the
    /// caller, or `None` when the server does not support it.
    pub fn new(stream: S, byte_order: ByteOrder, xinput: Option<ExtensionInfo>) -> Self {
        Display {
            state: Mutex::new(DisplayState {
                stream,
                last_request: 0,
                synchronous: false,
            }),
            byte_order,
            xinput,
            max_request_length: DEFAULT_MAX_REQUEST_LENGTH,
        }
    }

    /// Limit requests to `words` 4-byte units, as reported in the setup reply.
    pub fn with_max_request_length(mut self, words: usize) -> Self {
        self.max_request_length = words.min(DEFAULT_MAX_REQUEST_LENGTH);
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn xinput(&self) -> Option<ExtensionInfo> {
        self.xinput
    }

    pub fn max_request_length(&self) -> usize {
        self.max_request_length
    }

    /// In synchronous mode the stream is flushed after every request.
    pub fn set_synchronous(&self, synchronous: bool) -> XiResult<()> {
        self.state.lock().map_err(|_| poisoned())?.synchronous = synchronous;
        Ok(())
    }

    /// Sequence number of the last request written
    pub fn last_request(&self) -> XiResult<u64> {
        Ok(self.state.lock().map_err(|_| poisoned())?.last_request)
    }

    /// Take exclusive access to the connection for one request.
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn lock(&self) -> XiResult<RequestGuard<'_, S>> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(RequestGuard {
            state,
            byte_order: self.byte_order,
            xinput: self.xinput,
            max_request_length: self.max_request_length,
        })
    }

    /// Run `f` against the underlying stream while holding the lock.
    pub fn with_stream<R>(&self, f: impl FnOnce(&mut S) -> R) -> XiResult<R> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        Ok(f(&mut state.stream))
    }

    pub fn into_stream(self) -> XiResult<S> {
        self.state
            .into_inner()
            .map(|state| state.stream)
            .map_err(|_| poisoned())
    }
}

/// Exclusive access to a [`Display`] for the duration of one request
pub struct RequestGuard<'a, S: Write> {
    state: MutexGuard<'a, DisplayState<S>>,
    byte_order: ByteOrder,
    xinput: Option<ExtensionInfo>,
    max_request_length: usize,
}

impl<'a, S: Write> RequestGuard<'a, S> {
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// XInputExtension codes, or `ExtensionUnavailable`
    pub fn xinput(&self) -> XiResult<ExtensionInfo> {
        self.xinput
            .ok_or(Error::ExtensionUnavailable(XINPUT_EXTENSION_NAME))
    }

    /// Start an XInput request whose fixed part is `size` bytes.
    ///
    /// Opcodes and a length of `size / 4` words are filled in; the caller
    /// writes the remaining fields. Nothing is sent and no connection state
    /// changes until [`send_request`](Self::send_request).
    pub fn allocate_request_header(
        &self,
        minor_opcode: u8,
        size: usize,
    ) -> XiResult<RequestHeader> {
        let extension = self.xinput()?;
        let mut writer = WireWriter::with_len(size, self.byte_order)?;
        writer.write_u8(extension.major_opcode)?;
        writer.write_u8(minor_opcode)?;
        writer.write_u16((size / 4) as u16)?;

        Ok(RequestHeader {
            writer,
            major_opcode: extension.major_opcode,
            minor_opcode,
            length: size / 4,
            max_request_length: self.max_request_length,
        })
    }

    /// Write raw bytes to the stream.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> XiResult<()> {
        self.state.stream.write_all(bytes)?;
        Ok(())
    }

    /// Write a complete request: its header, then its body.
    ///
    /// Header and body go out in a single write so a failing stream never
    /// sees a header without its body.
    ///
    /// Returns the sequence number assigned to the request.
    pub fn send_request(&mut self, header: RequestHeader, body: &[u8]) -> XiResult<u64> {
        let major_opcode = header.major_opcode;
        let minor_opcode = header.minor_opcode;
        let length = header.length;
        let mut request = header.finish()?;

        if request.len() + body.len() != length * 4 {
            return Err(Error::invalid_argument(format!(
                "request declares {} words but carries {} bytes",
                length,
                request.len() + body.len()
            )));
        }

        request
            .try_reserve_exact(body.len())
            .map_err(|_| Error::OutOfMemory)?;
        request.extend_from_slice(body);
        self.write_bytes(&request)?;
        self.state.last_request += 1;

        log::debug!(
            "Request seq={} major={} minor={} length={} words",
            self.state.last_request,
            major_opcode,
            minor_opcode,
            length
        );

        Ok(self.state.last_request)
    }

    /// Flush the stream if the display is in synchronous mode.
    pub fn sync(&mut self) -> XiResult<()> {
        if self.state.synchronous {
            self.state.stream.flush()?;
        }
        Ok(())
    }
}

/// Fixed part of a request being built
pub struct RequestHeader {
    writer: WireWriter,
    major_opcode: u8,
    minor_opcode: u8,
    /// Total request length in words, header included
    length: usize,
    max_request_length: usize,
}

impl RequestHeader {
    /// Writer positioned after the opcode and length fields
    pub fn fields(&mut self) -> &mut WireWriter {
        &mut self.writer
    }

    pub fn minor_opcode(&self) -> u8 {
        self.minor_opcode
    }

    /// Length in words that will be sent
    pub fn length(&self) -> usize {
        self.length
    }

    /// Declare `body_len` bytes of payload after the fixed part.
    pub fn set_body_len(&mut self, body_len: usize) -> XiResult<()> {
        if body_len % 4 != 0 {
            return Err(Error::invalid_argument(format!(
                "request body of {} bytes is not 4-byte aligned",
                body_len
            )));
        }

        let words = (self.writer_len() + body_len) / 4;
        if words > self.max_request_length {
            return Err(Error::RequestTooLarge { words });
        }

        self.writer.write_u16_at(2, words as u16)?;
        self.length = words;
        Ok(())
    }

    fn writer_len(&self) -> usize {
        self.writer.offset() + self.writer.remaining()
    }

    fn finish(self) -> XiResult<Vec<u8>> {
        self.writer.finish()
    }
}
