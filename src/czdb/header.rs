//! Hyper header, encrypted metadata, super part, header block table and
//! geo dictionary parsing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use super::arena::Arena;
use super::crypto;
use super::error::{CzdbError, Result};
use super::geo::GeoData;
use super::models::{
    DbType, HyperHeader, Metadata, SuperPart, HEADER_BLOCK_LENGTH, HYPER_HEADER_LENGTH,
    SUPER_PART_LENGTH,
};

/// Parse the cleartext 12-byte preamble at the start of the image.
pub(crate) fn parse_hyper_header(arena: &Arena) -> Result<HyperHeader> {
    let raw = arena.slice(0, HYPER_HEADER_LENGTH).map_err(|_| {
        CzdbError::InvalidDatabase(format!(
            "file is {} bytes, shorter than the {}-byte hyper header",
            arena.len(),
            HYPER_HEADER_LENGTH
        ))
    })?;
    Ok(HyperHeader {
        version: LittleEndian::read_u32(&raw[0..4]),
        client_id: LittleEndian::read_u32(&raw[4..8]),
        encrypted_data_length: LittleEndian::read_u32(&raw[8..12]) as usize,
    })
}

/// Validate the configured key: present and decodable base64.
pub(crate) fn decode_key(key: &str) -> Result<Vec<u8>> {
    if key.is_empty() {
        return Err(CzdbError::KeyRequired);
    }
    Ok(STANDARD.decode(key)?)
}

/// Decrypt the metadata block that follows the hyper header.
///
/// The 8-byte plaintext packs the expiration date (bits 0..19, decimal
/// "YYMMDD") and the licensed client id (bits 20..31) into its first word;
/// the second word is the length of the random padding between the
/// ciphertext and the super part.
pub(crate) fn decrypt_metadata(
    arena: &Arena,
    header: &HyperHeader,
    key_bytes: &[u8],
) -> Result<Metadata> {
    let ciphertext = arena.slice(HYPER_HEADER_LENGTH, header.encrypted_data_length)?;
    let plaintext = crypto::ecb_decrypt(ciphertext, key_bytes)?;
    if plaintext.len() < 8 {
        return Err(CzdbError::InvalidDatabase(format!(
            "decrypted metadata is {} bytes, expected at least 8",
            plaintext.len()
        )));
    }
    let word0 = LittleEndian::read_u32(&plaintext[0..4]);
    let metadata = Metadata {
        client_id: word0 >> 20,
        expiration_date: word0 & 0xF_FFFF,
        random_bytes_length: LittleEndian::read_u32(&plaintext[4..8]) as usize,
    };
    debug!(
        "metadata: client_id={}, expiration_date={}, random_bytes_length={}",
        metadata.client_id, metadata.expiration_date, metadata.random_bytes_length
    );
    Ok(metadata)
}

/// Parse the 17-byte super part at `base_offset`.
pub(crate) fn parse_super_part(arena: &Arena, base_offset: usize) -> Result<SuperPart> {
    let raw = arena.slice(base_offset, SUPER_PART_LENGTH)?;
    let super_part = SuperPart {
        db_type: DbType::from_type_byte(raw[0]),
        file_size: LittleEndian::read_u32(&raw[1..5]),
        first_index_ptr: LittleEndian::read_u32(&raw[5..9]),
        total_header_block_size: LittleEndian::read_u32(&raw[9..13]) as usize,
        last_index_ptr: LittleEndian::read_u32(&raw[13..17]) as usize,
    };
    debug!(
        "super part: type={:?}, file_size={}, first_index_ptr={}, header_size={}, last_index_ptr={}",
        super_part.db_type,
        super_part.file_size,
        super_part.first_index_ptr,
        super_part.total_header_block_size,
        super_part.last_index_ptr
    );
    Ok(super_part)
}

/// Walk the header block table that follows the super part.
///
/// Entries are 20 bytes: a 16-byte start IP (left-aligned for IPv4) and a
/// u32 pointer naming the LAST index block the entry covers. A zero pointer
/// terminates the table early regardless of the declared size.
pub(crate) fn parse_header_blocks(
    arena: &Arena,
    base_offset: usize,
    total_size: usize,
) -> Result<(Vec<[u8; 16]>, Vec<usize>)> {
    let capacity = total_size / HEADER_BLOCK_LENGTH;
    let mut ips = Vec::with_capacity(capacity);
    let mut ptrs = Vec::with_capacity(capacity);
    let table_start = base_offset + SUPER_PART_LENGTH;

    let mut pos = 0;
    while pos + HEADER_BLOCK_LENGTH <= total_size {
        let entry = arena.slice(table_start + pos, HEADER_BLOCK_LENGTH)?;
        let index_ptr = LittleEndian::read_u32(&entry[16..20]);
        if index_ptr == 0 {
            break;
        }
        let mut ip = [0u8; 16];
        ip.copy_from_slice(&entry[..16]);
        ips.push(ip);
        ptrs.push(index_ptr as usize);
        pos += HEADER_BLOCK_LENGTH;
    }

    debug!("header table: {} entries ({} bytes declared)", ips.len(), total_size);
    Ok((ips, ptrs))
}

/// Load the column-projection dictionary that sits one index block past the
/// last index pointer. A zero `column_selection` word means no dictionary
/// exists and records carry only their inline text.
pub(crate) fn load_geo_data(
    arena: &Arena,
    base_offset: usize,
    super_part: &SuperPart,
    key: &str,
) -> Result<GeoData> {
    let block_start =
        base_offset + super_part.last_index_ptr + super_part.db_type.index_block_length();
    let column_selection = arena.read_u32_le(block_start)?;
    if column_selection == 0 {
        debug!("column selection is zero, no geo dictionary present");
        return Ok(GeoData {
            column_selection,
            data: Vec::new(),
        });
    }

    let geo_data_length = arena.read_u32_le(block_start + 4)? as usize;
    let obfuscated = arena.slice(block_start + 8, geo_data_length)?;
    let data = crypto::xor_decrypt(obfuscated, key.as_bytes());
    debug!(
        "geo dictionary: {} bytes, column selection {:#010x}",
        data.len(),
        column_selection
    );
    Ok(GeoData {
        column_selection,
        data,
    })
}
