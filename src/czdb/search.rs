//! Two-level binary search: header table first, then index blocks.

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};

use super::arena::Arena;
use super::error::Result;

/// One matched index block: the covering range and its record pointer.
#[derive(Debug)]
pub(crate) struct IndexHit {
    pub start_ip: Vec<u8>,
    pub end_ip: Vec<u8>,
    pub data_ptr: usize,
    pub data_length: usize,
}

/// Level 1: bracket the query inside the header table.
///
/// Returns super-part-relative byte offsets `(sptr, eptr)` delimiting the
/// run of index blocks to probe; the block at `eptr` itself is included.
/// `None` means the query sorts before the first header entry. An IPv4
/// query compares against the leading 4 bytes of the stored 16-byte
/// left-aligned entries.
pub(crate) fn search_header(
    header_ips: &[[u8; 16]],
    header_ptrs: &[usize],
    index_block_length: usize,
    ip: &[u8],
) -> Option<(usize, usize)> {
    let header_len = header_ips.len();
    if header_len == 0 {
        return None;
    }

    let mut low = 0i64;
    let mut high = header_len as i64 - 1;
    while low <= high {
        let mid = ((low + high) >> 1) as usize;
        match ip.cmp(&header_ips[mid][..ip.len()]) {
            Ordering::Less => high = mid as i64 - 1,
            Ordering::Greater => low = mid as i64 + 1,
            Ordering::Equal => {
                let sptr = header_ptrs[if mid > 0 { mid - 1 } else { mid }];
                return Some((sptr, header_ptrs[mid]));
            }
        }
    }

    // The query fell between entries; pick the bracket that still contains
    // its covering blocks.
    if low == 0 && high <= 0 {
        return None;
    }
    if (low as usize) < header_len {
        Some((header_ptrs[low as usize - 1], header_ptrs[low as usize]))
    } else if high >= 0 && (high as usize) + 1 < header_len {
        Some((header_ptrs[high as usize], header_ptrs[high as usize + 1]))
    } else {
        let sptr = header_ptrs[header_len - 1];
        Some((sptr, sptr + index_block_length))
    }
}

/// Level 2: binary search the index blocks between `sptr` and `eptr`
/// (inclusive) for the block whose closed range covers the query.
///
/// Returns `None` when no block covers the address; the format guarantees
/// full coverage, so the caller decides whether that is one of the
/// documented gaps or corruption.
pub(crate) fn search_index(
    arena: &Arena,
    base_offset: usize,
    sptr: usize,
    eptr: usize,
    ip_length: usize,
    index_block_length: usize,
    ip: &[u8],
) -> Result<Option<IndexHit>> {
    let mut low = 0i64;
    let mut high = (eptr.saturating_sub(sptr) / index_block_length) as i64;

    while low <= high {
        let mid = ((low + high) >> 1) as usize;
        let block = arena.slice(
            base_offset + sptr + mid * index_block_length,
            index_block_length,
        )?;
        let start_ip = &block[..ip_length];
        let end_ip = &block[ip_length..2 * ip_length];

        if ip >= start_ip && ip <= end_ip {
            return Ok(Some(IndexHit {
                start_ip: start_ip.to_vec(),
                end_ip: end_ip.to_vec(),
                data_ptr: LittleEndian::read_u32(&block[2 * ip_length..2 * ip_length + 4]) as usize,
                data_length: block[2 * ip_length + 4] as usize,
            }));
        }
        if ip < start_ip {
            high = mid as i64 - 1;
        } else {
            low = mid as i64 + 1;
        }
    }

    Ok(None)
}
