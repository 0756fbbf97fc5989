// RESP2 wire codec: command encoding and incremental reply decoding.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::core::error::{Error, ErrorKind};

/// Upper bound on a single bulk payload; anything larger is treated as a
/// corrupt stream rather than buffered indefinitely.
pub const MAX_BULK_LEN: usize = 64 * 1024 * 1024;

/// Upper bound on array arity; brokers never send pushes wider than a few
/// elements.
pub const MAX_ARRAY_LEN: usize = 1024;

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Frame>>),
}

/// Encode a client command as an array of bulk strings.
pub fn encode_command(parts: &[&[u8]]) -> Bytes {
    let mut buf = BytesMut::with_capacity(16 + parts.iter().map(|part| part.len() + 16).sum::<usize>());
    buf.put_u8(b'*');
    buf.extend_from_slice(parts.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for part in parts {
        buf.put_u8(b'$');
        buf.extend_from_slice(part.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(part);
        buf.extend_from_slice(b"\r\n");
    }
    buf.freeze()
}

/// Decode one complete frame from the front of `buf`, consuming exactly its
/// bytes. Returns `None` when the buffer holds only a partial frame.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, Error> {
    let mut pos = 0usize;
    match parse_frame(buf, &mut pos)? {
        Some(frame) => {
            buf.advance(pos);
            Ok(Some(frame))
        }
        None => Ok(None),
    }
}

fn parse_frame(input: &[u8], pos: &mut usize) -> Result<Option<Frame>, Error> {
    let line = match read_line(input, pos) {
        Some(line) => line,
        None => return Ok(None),
    };
    let (&marker, rest) = match line.split_first() {
        Some(split) => split,
        None => return Err(corrupt("empty frame header")),
    };
    match marker {
        b'+' => Ok(Some(Frame::Simple(decode_text(rest)?))),
        b'-' => Ok(Some(Frame::Error(decode_text(rest)?))),
        b':' => Ok(Some(Frame::Integer(decode_int(rest)?))),
        b'$' => {
            let len = decode_int(rest)?;
            if len < 0 {
                return Ok(Some(Frame::Bulk(None)));
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(corrupt("bulk payload exceeds max length"));
            }
            let end = *pos + len;
            if input.len() < end + 2 {
                return Ok(None);
            }
            if &input[end..end + 2] != b"\r\n" {
                return Err(corrupt("bulk payload missing terminator"));
            }
            let payload = Bytes::copy_from_slice(&input[*pos..end]);
            *pos = end + 2;
            Ok(Some(Frame::Bulk(Some(payload))))
        }
        b'*' => {
            let len = decode_int(rest)?;
            if len < 0 {
                return Ok(Some(Frame::Array(None)));
            }
            let len = len as usize;
            if len > MAX_ARRAY_LEN {
                return Err(corrupt("array exceeds max length"));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                match parse_frame(input, pos)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Frame::Array(Some(items))))
        }
        other => Err(corrupt(format!("unknown frame marker 0x{other:02x}"))),
    }
}

fn read_line<'a>(input: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let start = *pos;
    let mut index = start;
    while index + 1 < input.len() {
        if input[index] == b'\r' && input[index + 1] == b'\n' {
            *pos = index + 2;
            return Some(&input[start..index]);
        }
        index += 1;
    }
    None
}

fn decode_text(bytes: &[u8]) -> Result<String, Error> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| corrupt("frame text is not utf-8").with_source(err))
}

fn decode_int(digits: &[u8]) -> Result<i64, Error> {
    let text =
        std::str::from_utf8(digits).map_err(|err| corrupt("frame length is not utf-8").with_source(err))?;
    text.parse::<i64>()
        .map_err(|_| corrupt(format!("invalid frame length '{text}'")))
}

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Corrupt).with_message(message)
}
