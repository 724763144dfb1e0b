//! Read cursor and line counter for one tailed file.

/// Where the next read starts and which line number comes next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Position {
    byte_offset: u64,
    line_number: u64,
    /// The last consumed byte was a bare `\r`; a `\n` at the next offset
    /// belongs to it.
    pending_cr: bool,
}

impl Position {
    pub(crate) fn new(byte_offset: u64, line_number: u64, pending_cr: bool) -> Self {
        Self {
            byte_offset,
            line_number,
            pending_cr,
        }
    }

    pub(crate) fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    /// Highest line number assigned so far (0 before the first line).
    pub(crate) fn line_number(&self) -> u64 {
        self.line_number
    }

    pub(crate) fn pending_cr(&self) -> bool {
        self.pending_cr
    }

    /// Assign the next line number.
    pub(crate) fn next_line_number(&mut self) -> u64 {
        self.line_number += 1;
        self.line_number
    }

    /// Move the cursor past `consumed` bytes.
    pub(crate) fn advance(&mut self, consumed: u64, pending_cr: bool) {
        self.byte_offset += consumed;
        self.pending_cr = pending_cr;
    }

    /// Move the cursor back to the start of the file. Line numbering is kept.
    pub(crate) fn rewind(&mut self) {
        self.byte_offset = 0;
        self.pending_cr = false;
    }
}

/// Detect if the file was truncated by comparing current size with last position
pub(crate) fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}

/// Calculate bytes to read based on current size and last position
pub(crate) fn calculate_bytes_to_read(current_size: u64, last_position: u64) -> Option<u64> {
    if current_size <= last_position {
        None
    } else {
        Some(current_size - last_position)
    }
}
