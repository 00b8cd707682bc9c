//! Geo dictionary decoding and column projection

use std::io::Cursor;

use log::trace;
use rmpv::{decode::read_value, Value};

use super::error::{CzdbError, Result};

/// The column-projection dictionary shared by all records.
///
/// `data` holds the XOR-decrypted Geo Map Block payload; `column_selection`
/// is the 32-bit bitmap choosing which positions of each per-record column
/// vector are emitted. Bit 0 is reserved and never consumed.
#[derive(Debug, Default)]
pub(crate) struct GeoData {
    pub column_selection: u32,
    pub data: Vec<u8>,
}

impl GeoData {
    /// Decode one record payload into its final text form.
    ///
    /// The payload is a MessagePack stream: an i64 mix word
    /// `(geo_data_length << 24) | geo_data_ptr` followed by the inline
    /// `other_data` string. A zero mix word means the record carries no
    /// column data and `other_data` is returned unchanged. Otherwise the
    /// pointer is resolved inside the cached dictionary buffer, the column
    /// vector is decoded, and the selected values are emitted TAB-separated
    /// with empty values rewritten to `"null"`.
    pub fn parse_geo_info(&self, payload: &[u8]) -> Result<String> {
        let mut record = Cursor::new(payload);
        let geo_pos_mix_size = match read_value(&mut record)? {
            Value::Integer(n) => n.as_i64().ok_or_else(|| {
                CzdbError::DecodeError("geo mix word does not fit in i64".to_string())
            })?,
            _ => {
                return Err(CzdbError::DecodeError(
                    "record payload did not start with an integer".to_string(),
                ))
            }
        };
        let other_data = match read_value(&mut record)? {
            Value::String(s) => s.into_str().ok_or_else(|| {
                CzdbError::DecodeError("record text is not valid UTF-8".to_string())
            })?,
            _ => {
                return Err(CzdbError::DecodeError(
                    "record payload is missing its text field".to_string(),
                ))
            }
        };

        if geo_pos_mix_size == 0 {
            return Ok(other_data);
        }

        // High 8 bits carry the entry length, low 24 bits the entry offset,
        // both within the dictionary buffer rather than the file image.
        let geo_len = ((geo_pos_mix_size >> 24) & 0xFF) as usize;
        let geo_ptr = (geo_pos_mix_size & 0x00FF_FFFF) as usize;
        let entry = self
            .data
            .get(geo_ptr..geo_ptr + geo_len)
            .ok_or_else(|| {
                CzdbError::InvalidDatabase(format!(
                    "dictionary entry [{}..{}] exceeds dictionary size {}",
                    geo_ptr,
                    geo_ptr + geo_len,
                    self.data.len()
                ))
            })?;

        let columns = match read_value(&mut Cursor::new(entry))? {
            Value::Array(values) => values,
            _ => {
                return Err(CzdbError::DecodeError(
                    "dictionary entry is not an array".to_string(),
                ))
            }
        };
        trace!(
            "projecting {} columns with selection {:#010x}",
            columns.len(),
            self.column_selection
        );

        let mut info = String::new();
        for (i, value) in columns.iter().enumerate() {
            let selected = i + 1 < 32 && (self.column_selection >> (i + 1)) & 1 == 1;
            if !selected {
                continue;
            }
            let text = value.as_str().ok_or_else(|| {
                CzdbError::DecodeError("dictionary column is not a string".to_string())
            })?;
            info.push_str(if text.is_empty() { "null" } else { text });
            info.push('\t');
        }
        info.push('\t');
        info.push_str(&other_data);
        Ok(info)
    }
}
