//! Helpers for writing Protocol Buffers messages by hand.
//!
//! The intake schemas are small and stable, so rather than generating message types, payloads are written field by
//! field directly to a `CodedOutputStream`. Nested messages and packed repeated fields are written to a scratch buffer
//! first, and then emitted as length-delimited fields.

use protobuf::{CodedOutputStream, Error};

/// Encodes a message into a new buffer.
pub fn encode_message<F>(f: F) -> Result<Vec<u8>, Error>
where
    F: FnOnce(&mut CodedOutputStream<'_>) -> Result<(), Error>,
{
    let mut buf = Vec::new();
    {
        let mut os = CodedOutputStream::vec(&mut buf);
        f(&mut os)?;
        os.flush()?;
    }
    Ok(buf)
}

/// Writes a nested message as a length-delimited field.
pub fn write_message<F>(os: &mut CodedOutputStream<'_>, field_number: u32, f: F) -> Result<(), Error>
where
    F: FnOnce(&mut CodedOutputStream<'_>) -> Result<(), Error>,
{
    let nested = encode_message(f)?;
    os.write_bytes(field_number, &nested)
}

/// Writes a string field, skipping it if empty.
pub fn write_non_empty_string(os: &mut CodedOutputStream<'_>, field_number: u32, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Ok(());
    }
    os.write_string(field_number, value)
}

/// Writes a repeated string field.
pub fn write_repeated_string<S>(os: &mut CodedOutputStream<'_>, field_number: u32, values: &[S]) -> Result<(), Error>
where
    S: AsRef<str>,
{
    for value in values {
        os.write_string(field_number, value.as_ref())?;
    }
    Ok(())
}

/// Writes a packed repeated `sint32` field, skipping it if empty.
pub fn write_packed_sint32(os: &mut CodedOutputStream<'_>, field_number: u32, values: &[i32]) -> Result<(), Error> {
    if values.is_empty() {
        return Ok(());
    }

    let packed = encode_message(|inner| {
        for value in values {
            inner.write_sint32_no_tag(*value)?;
        }
        Ok(())
    })?;
    os.write_bytes(field_number, &packed)
}

/// Writes a packed repeated `uint32` field, skipping it if empty.
pub fn write_packed_uint32(os: &mut CodedOutputStream<'_>, field_number: u32, values: &[u32]) -> Result<(), Error> {
    if values.is_empty() {
        return Ok(());
    }

    let packed = encode_message(|inner| {
        for value in values {
            inner.write_uint32_no_tag(*value)?;
        }
        Ok(())
    })?;
    os.write_bytes(field_number, &packed)
}
