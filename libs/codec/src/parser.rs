//! Envelope deserialization
//!
//! Checked decode of a wire frame back into a work item. Every size field is
//! validated before any section is touched; a frame whose total length does
//! not match the declared sections is rejected rather than partially decoded.
//!
//! The envelope carries no session-level fields: `origin_id` and
//! `reply_requested` are restored by the transport session after decode, and
//! `is_reply` is derived from the response status (every reply carries one).

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use types::{BufferPool, Priority, ResponseStatus, ServiceAddress, WorkItem};

use crate::constants::{ticks_to_datetime, HEADER_SIZE, MAX_SECTION_SIZE};
use crate::error::{ParseError, ParseResult};

/// Decode a wire frame; payload sections are copied into pooled buffers.
pub fn deserialize(data: &[u8], pool: &BufferPool) -> ParseResult<WorkItem> {
    if data.len() < HEADER_SIZE {
        return Err(ParseError::Truncated {
            needed: HEADER_SIZE,
            available: data.len(),
        });
    }

    let mut header = Cursor::new(&data[..HEADER_SIZE]);
    // Reads below cannot fail: the cursor holds exactly HEADER_SIZE bytes.
    let mut read_i32 = |cur: &mut Cursor<&[u8]>| cur.read_i32::<LittleEndian>().unwrap_or(0);

    let unique_id = read_i32(&mut header);

    let priority_byte = header.read_u8().unwrap_or(0);
    let priority =
        Priority::try_from(priority_byte).map_err(|_| ParseError::InvalidPriority(priority_byte))?;

    let ticks = header.read_i64::<LittleEndian>().unwrap_or(0);
    let creation_date = ticks_to_datetime(ticks)?;

    let destination = ServiceAddress::from_wire(
        read_i32(&mut header),
        read_i32(&mut header),
        read_i32(&mut header),
    );
    let source = ServiceAddress::from_wire(
        read_i32(&mut header),
        read_i32(&mut header),
        read_i32(&mut header),
    );

    let status_byte = header.read_u8().unwrap_or(0);
    let response_status = ResponseStatus::try_from(status_byte)
        .map_err(|_| ParseError::InvalidStatus(status_byte))?;

    let text_len = section_size("message text", read_i32(&mut header))?;
    let request_len = section_size("request payload", read_i32(&mut header))?;
    let response_len = section_size("response payload", read_i32(&mut header))?;

    let declared = HEADER_SIZE + text_len + request_len + response_len;
    if data.len() != declared {
        return Err(ParseError::LengthMismatch {
            declared,
            actual: data.len(),
        });
    }

    let text_start = HEADER_SIZE;
    let request_start = text_start + text_len;
    let response_start = request_start + request_len;

    let message_text = if text_len == 0 {
        None
    } else {
        Some(String::from_utf8(data[text_start..request_start].to_vec())?)
    };

    Ok(WorkItem {
        unique_id,
        priority,
        origin_id: 0,
        is_reply: response_status != ResponseStatus::None,
        reply_requested: false,
        destination,
        source,
        response_status,
        creation_date,
        message_text,
        request_payload: pool.payload_from_slice(&data[request_start..response_start]),
        response_payload: pool.payload_from_slice(&data[response_start..]),
    })
}

fn section_size(field: &'static str, size: i32) -> ParseResult<usize> {
    if size < 0 {
        return Err(ParseError::NegativeSectionSize { field, size });
    }
    let size = size as usize;
    if size > MAX_SECTION_SIZE {
        return Err(ParseError::SectionTooLarge {
            field,
            size,
            max: MAX_SECTION_SIZE,
        });
    }
    Ok(size)
}
