//! File reading utilities: the initial tail window and incremental reads.

use crate::error::Result;
use crate::model::TailLine;
use crate::position::{Position, calculate_bytes_to_read, detect_file_truncation};
use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const CHUNK_SIZE: usize = 64 * 1024;

/// The tail window read at start-up.
#[derive(Debug)]
pub(crate) struct InitialRead {
    pub(crate) lines: Vec<TailLine>,
    pub(crate) position: Position,
}

/// The file shrank below the read position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Truncation {
    pub(crate) offset: u64,
    pub(crate) length: u64,
}

/// Result of one incremental read cycle.
#[derive(Debug, Default)]
pub(crate) struct ReadBatch {
    pub(crate) lines: Vec<TailLine>,
    pub(crate) truncation: Option<Truncation>,
}

/// Complete lines found in a byte buffer.
#[derive(Debug, PartialEq, Eq)]
struct SplitLines<'a> {
    lines: Vec<&'a [u8]>,
    /// Bytes up to and including the last terminator.
    consumed: usize,
    /// The buffer ended on a bare `\r` that may still be followed by `\n`.
    pending_cr: bool,
}

/// Split `buf` on `\n`, `\r\n` and bare `\r`, keeping only terminated lines.
///
/// With `skip_leading_lf`, a `\n` at the very start is the tail of a `\r\n`
/// whose `\r` ended the previous buffer and is consumed without a line.
fn split_complete_lines(buf: &[u8], skip_leading_lf: bool) -> SplitLines<'_> {
    if buf.is_empty() {
        return SplitLines {
            lines: Vec::new(),
            consumed: 0,
            pending_cr: skip_leading_lf,
        };
    }

    let mut lines = Vec::new();
    let mut start = if skip_leading_lf && buf[0] == b'\n' { 1 } else { 0 };
    let mut consumed = start;
    let mut pending_cr = false;

    while let Some(idx) = buf[start..]
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
    {
        let end = start + idx;
        lines.push(&buf[start..end]);

        start = if buf[end] == b'\r' {
            match buf.get(end + 1) {
                Some(b'\n') => end + 2,
                Some(_) => end + 1,
                None => {
                    pending_cr = true;
                    end + 1
                }
            }
        } else {
            end + 1
        };
        consumed = start;
    }

    SplitLines {
        lines,
        consumed,
        pending_cr,
    }
}

fn bom_len(buf: &[u8]) -> usize {
    if buf.starts_with(&UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read the whole file once, keeping only the last `window` complete lines.
///
/// The returned position points just past the last terminator and its line
/// number is the total count of complete lines, so numbering carries on from
/// the lines that fell outside the window.
pub(crate) async fn read_initial_tail(file_path: &Path, window: usize) -> Result<InitialRead> {
    let mut file = File::open(file_path).await?;

    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut pending: Vec<u8> = Vec::new();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(window.min(1024));
    let mut offset = 0u64;
    let mut total_lines = 0u64;
    let mut pending_cr = false;
    let mut bom_checked = false;

    loop {
        let n = file.read(&mut chunk).await?;
        pending.extend_from_slice(&chunk[..n]);

        if !bom_checked && (pending.len() >= UTF8_BOM.len() || n == 0) {
            let skip = bom_len(&pending);
            pending.drain(..skip);
            offset += skip as u64;
            bom_checked = true;
        }

        if bom_checked {
            let split = split_complete_lines(&pending, pending_cr);
            for line in split.lines {
                total_lines += 1;
                if window == 0 {
                    continue;
                }
                if tail.len() == window {
                    tail.pop_front();
                }
                tail.push_back(decode_line(line));
            }
            let consumed = split.consumed;
            pending_cr = split.pending_cr;
            offset += consumed as u64;
            pending.drain(..consumed);
        }

        if n == 0 {
            break;
        }
    }

    let first_number = total_lines - tail.len() as u64;
    let lines = tail
        .into_iter()
        .zip(first_number + 1..)
        .map(|(content, number)| TailLine::new(content, number))
        .collect();

    Ok(InitialRead {
        lines,
        position: Position::new(offset, total_lines, pending_cr),
    })
}

/// Read complete lines appended since `position`, numbering them and moving
/// the position past the consumed bytes.
///
/// A shrunken file is reported through [`ReadBatch::truncation`] and re-read
/// from offset 0. The trailing unterminated line, if any, stays unread.
pub(crate) async fn read_new_lines(file_path: &Path, position: &mut Position) -> Result<ReadBatch> {
    let mut file = File::open(file_path).await?;
    let current_size = file.metadata().await?.len();

    let mut batch = ReadBatch::default();

    if detect_file_truncation(current_size, position.byte_offset()) {
        batch.truncation = Some(Truncation {
            offset: position.byte_offset(),
            length: current_size,
        });
        position.rewind();
    }

    let Some(bytes_to_read) = calculate_bytes_to_read(current_size, position.byte_offset()) else {
        return Ok(batch);
    };

    file.seek(SeekFrom::Start(position.byte_offset())).await?;

    // Bounded by the length seen above so a write racing this read is left
    // for the next cycle.
    let capacity = usize::try_from(bytes_to_read).map_or(CHUNK_SIZE, |n| n.min(CHUNK_SIZE));
    let mut buf = Vec::with_capacity(capacity);
    file.take(bytes_to_read).read_to_end(&mut buf).await?;

    let skip = if position.byte_offset() == 0 {
        bom_len(&buf)
    } else {
        0
    };

    let split = split_complete_lines(&buf[skip..], position.pending_cr());
    batch.lines = split
        .lines
        .into_iter()
        .map(|line| TailLine::new(decode_line(line), position.next_line_number()))
        .collect();
    position.advance((skip + split.consumed) as u64, split.pending_cr);

    Ok(batch)
}
