//! Line reassembly for chunked process output.

/// Splits an arbitrarily chunked text stream into complete lines, retaining
/// an incomplete trailing fragment across calls.
///
/// Each process stream gets its own splitter; buffers from different streams
/// are never mixed.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: String,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the complete lines it finished.
    ///
    /// Trailing carriage returns are stripped and fully empty lines are
    /// suppressed. The unterminated tail stays buffered for the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);
        if !self.buf.contains('\n') {
            return Vec::new();
        }

        let mut parts: Vec<&str> = self.buf.split('\n').collect();
        let remainder = parts.pop().unwrap_or("").to_string();
        let lines: Vec<String> = parts
            .iter()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.buf = remainder;
        lines
    }

    /// Returns the buffered remainder as a final, unterminated line.
    ///
    /// Called once at stream end: the tool may not newline-terminate its
    /// last line. Returns `None` when nothing is buffered.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.buf);
        let tail = tail.strip_suffix('\r').unwrap_or(&tail).to_string();
        if tail.is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    /// Currently buffered, incomplete tail.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.buf
    }
}
