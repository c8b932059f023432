//! Envelope serialization
//!
//! Writes a work item into its wire frame: 50-byte fixed header, then the
//! UTF-8 message text and the two opaque payload sections. All integers are
//! little-endian; zero-length sections contribute a zero size field and no
//! bytes.

use bytes::{BufMut, Bytes, BytesMut};
use types::WorkItem;

use crate::constants::{datetime_to_ticks, HEADER_SIZE, MAX_SECTION_SIZE};
use crate::error::BuildError;

/// Exact frame size `serialize_to_buffer` will produce for this item.
pub fn serialized_size(item: &WorkItem) -> usize {
    HEADER_SIZE
        + item.message_text.as_deref().map_or(0, str::len)
        + item.request_payload.as_ref().map_or(0, |p| p.len())
        + item.response_payload.as_ref().map_or(0, |p| p.len())
}

/// Serialize a work item into a contiguous wire frame.
pub fn serialize_to_buffer(item: &WorkItem) -> Result<Bytes, BuildError> {
    let text = item.message_text.as_deref().unwrap_or("");
    let request = item.request_payload.as_ref().map_or(&[][..], |p| p.as_slice());
    let response = item.response_payload.as_ref().map_or(&[][..], |p| p.as_slice());

    check_section("message text", text.len())?;
    check_section("request payload", request.len())?;
    check_section("response payload", response.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + text.len() + request.len() + response.len());

    buf.put_i32_le(item.unique_id);
    buf.put_u8(item.priority as u8);
    buf.put_i64_le(datetime_to_ticks(item.creation_date));

    buf.put_i32_le(item.destination.service_type() as i32);
    buf.put_i32_le(item.destination.service_module() as i32);
    buf.put_i32_le(item.destination.service_function() as i32);
    buf.put_i32_le(item.source.service_type() as i32);
    buf.put_i32_le(item.source.service_module() as i32);
    buf.put_i32_le(item.source.service_function() as i32);

    buf.put_u8(item.response_status as u8);

    buf.put_i32_le(text.len() as i32);
    buf.put_i32_le(request.len() as i32);
    buf.put_i32_le(response.len() as i32);

    buf.put_slice(text.as_bytes());
    buf.put_slice(request);
    buf.put_slice(response);

    Ok(buf.freeze())
}

fn check_section(field: &'static str, size: usize) -> Result<(), BuildError> {
    if size > MAX_SECTION_SIZE {
        return Err(BuildError::SectionTooLarge {
            field,
            size,
            max: MAX_SECTION_SIZE,
        });
    }
    Ok(())
}
