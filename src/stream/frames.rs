// Line reassembly and update-event recognition for the streaming API.
//
// The public stream is server-sent events: `event: <type>` lines followed by
// `data: <json>` lines. Network chunks split lines arbitrarily, so bytes are
// buffered until a newline arrives.

use anyhow::Result;

/// Event line that marks the next data line as a new status.
pub const UPDATE_EVENT: &[u8] = b"event: update";
/// Prefix of data lines.
pub const DATA_PREFIX: &[u8] = b"data:";

/// Longest line accepted before the stream is treated as broken.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Accumulates raw chunks and yields complete lines.
///
/// Consumed bytes are compacted away on the next push, and bytes already
/// searched for a newline are not searched again.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Start of the first unconsumed line.
    start: usize,
    /// Everything before this offset is known to contain no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, without its `\n` (or `\r\n`) terminator.
    ///
    /// Fails once a line grows past [`MAX_LINE_LEN`], complete or not.
    pub fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        let from = self.scanned.max(self.start);
        let Some(pos) = self.buf[from..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            if self.pending() > MAX_LINE_LEN {
                anyhow::bail!("line exceeds {MAX_LINE_LEN} bytes without a newline");
            }
            return Ok(None);
        };

        let end = from + pos;
        if end - self.start > MAX_LINE_LEN {
            anyhow::bail!("line of {} bytes exceeds {MAX_LINE_LEN}", end - self.start);
        }

        let mut line = self.buf[self.start..end].to_vec();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.start = end + 1;
        self.scanned = self.start;
        Ok(Some(line))
    }

    /// Bytes of an incomplete trailing line.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }
}

/// Tracks whether the next data line belongs to an update event.
#[derive(Debug, Default)]
pub struct UpdateFramer {
    expecting_update: bool,
}

impl UpdateFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the payload if this line is the data of an
    /// update event.
    ///
    /// Lines other than the update marker and data lines leave the pending
    /// state untouched.
    pub fn feed<'a>(&mut self, line: &'a [u8]) -> Option<&'a [u8]> {
        if line == UPDATE_EVENT {
            self.expecting_update = true;
            return None;
        }
        if self.expecting_update {
            if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
                self.expecting_update = false;
                return Some(payload.strip_prefix(b" ").unwrap_or(payload));
            }
        }
        None
    }

    pub fn expecting_update(&self) -> bool {
        self.expecting_update
    }
}
