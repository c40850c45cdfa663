//! Incremental RESP2 parser.
//!
//! [`parse_frame`] consumes nothing on a partial frame: it returns
//! `Ok(None)` and the caller reads more bytes and retries. A complete
//! frame comes back with the number of bytes it occupied, so pipelined
//! input parses in a loop over one receive buffer.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::types::Frame;

/// Upper bound on a single bulk string (512MB, the Redis limit).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Upper bound on a declared array length. Commands never come close;
/// anything larger is a malicious or corrupt frame.
const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Maximum array nesting depth.
const MAX_DEPTH: usize = 32;

/// Parses one frame from `input`.
///
/// Returns `Ok(None)` when the buffer holds only a partial frame,
/// `Ok(Some((frame, consumed)))` on success.
pub fn parse_frame(input: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    parse_at_depth(input, 0)
}

fn parse_at_depth(input: &[u8], depth: usize) -> Result<Option<(Frame, usize)>, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep);
    }
    let Some(&prefix) = input.first() else {
        return Ok(None);
    };
    let body = &input[1..];
    match prefix {
        b'+' => parse_line(body, |line| Ok(Frame::Simple(to_string(line)?))),
        b'-' => parse_line(body, |line| Ok(Frame::Error(to_string(line)?))),
        b':' => parse_line(body, |line| Ok(Frame::Integer(parse_int(line)?))),
        b'$' => parse_bulk(body),
        b'*' => parse_array(body, depth),
        other => Err(ProtocolError::InvalidPrefix(other)),
    }
}

/// Parses a `<content>\r\n` line frame. `consumed` includes the prefix
/// byte the caller already stripped.
fn parse_line(
    body: &[u8],
    build: impl FnOnce(&[u8]) -> Result<Frame, ProtocolError>,
) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(end) = find_crlf(body) else {
        return Ok(None);
    };
    let frame = build(&body[..end])?;
    Ok(Some((frame, 1 + end + 2)))
}

fn parse_bulk(body: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(len_end) = find_crlf(body) else {
        return Ok(None);
    };
    let len = parse_int(&body[..len_end])?;
    if len == -1 {
        return Ok(Some((Frame::NullBulk, 1 + len_end + 2)));
    }
    if len < 0 || len > MAX_BULK_LEN {
        return Err(ProtocolError::InvalidFrameLength(len));
    }
    let len = len as usize;
    let data_start = len_end + 2;
    // need the payload plus its trailing CRLF
    if body.len() < data_start + len + 2 {
        return Ok(None);
    }
    if &body[data_start + len..data_start + len + 2] != b"\r\n" {
        return Err(ProtocolError::BadTerminator);
    }
    let data = Bytes::copy_from_slice(&body[data_start..data_start + len]);
    Ok(Some((Frame::Bulk(data), 1 + data_start + len + 2)))
}

fn parse_array(body: &[u8], depth: usize) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(len_end) = find_crlf(body) else {
        return Ok(None);
    };
    let len = parse_int(&body[..len_end])?;
    if len == -1 {
        return Ok(Some((Frame::NullArray, 1 + len_end + 2)));
    }
    if len < 0 || len > MAX_ARRAY_LEN {
        return Err(ProtocolError::InvalidFrameLength(len));
    }

    let mut items = Vec::with_capacity(len as usize);
    let mut offset = 1 + len_end + 2;
    for _ in 0..len {
        match parse_at_depth(&body[offset - 1..], depth + 1)? {
            Some((frame, consumed)) => {
                items.push(frame);
                offset += consumed;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((Frame::Array(items), offset)))
}

/// Position of the first CRLF, or `None` if incomplete.
fn find_crlf(input: &[u8]) -> Option<usize> {
    input.windows(2).position(|w| w == b"\r\n")
}

fn parse_int(digits: &[u8]) -> Result<i64, ProtocolError> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ProtocolError::InvalidInteger)
}

fn to_string(line: &[u8]) -> Result<String, ProtocolError> {
    String::from_utf8(line.to_vec()).map_err(|_| ProtocolError::BadTerminator)
}
