//! Data structures representing CZDB format components

use std::net::IpAddr;

/// Length of the cleartext hyper header at the start of the file.
pub(crate) const HYPER_HEADER_LENGTH: usize = 12;

/// Length of the super part: a type byte followed by four u32 fields.
/// Every pointer in the format is relative to the super part's start.
pub(crate) const SUPER_PART_LENGTH: usize = 17;

/// Length of one header block entry: 16-byte start IP + 4-byte index ptr.
pub(crate) const HEADER_BLOCK_LENGTH: usize = 20;

/// Sentinel text emitted for the documented coverage gaps in the official
/// database: the missing 0.0.0.0/32 and ::/128 records, and the absent
/// IPv4-mapped space in IPv6 files.
pub const DATA_NOT_FOUND: &str = "DataNotFound";

/// The IPv4-mapped zero address `::ffff:0.0.0.0`, which is what an IPv4 zero
/// query normalizes to against an IPv6 database.
pub(crate) const V4_MAPPED_ZERO: [u8; 16] =
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0, 0, 0, 0];

/// The last address of the IPv4-mapped region, `::ffff:255.255.255.255`.
pub(crate) const V4_MAPPED_LAST: [u8; 16] =
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];

/// Address family of a database, taken from bit 0 of the super part's type
/// byte: 0 means IPv4, anything else IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Ipv4,
    Ipv6,
}

impl DbType {
    pub(crate) fn from_type_byte(byte: u8) -> Self {
        if byte & 1 == 0 {
            DbType::Ipv4
        } else {
            DbType::Ipv6
        }
    }

    /// Native address width in bytes.
    pub(crate) fn ip_length(self) -> usize {
        match self {
            DbType::Ipv4 => 4,
            DbType::Ipv6 => 16,
        }
    }

    /// Width of one index block entry: two addresses, a 4-byte data pointer
    /// and a 1-byte data length.
    pub(crate) fn index_block_length(self) -> usize {
        match self {
            DbType::Ipv4 => 13,
            DbType::Ipv6 => 37,
        }
    }
}

/// The cleartext 12-byte preamble of a CZDB file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HyperHeader {
    /// Decimal "YYYYMMDD" build stamp, informational only.
    pub version: u32,
    pub client_id: u32,
    pub encrypted_data_length: usize,
}

/// The 8-byte plaintext recovered from the encrypted metadata block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Metadata {
    pub client_id: u32,
    /// Decimal "YYMMDD". Parsed and exposed, never enforced here.
    pub expiration_date: u32,
    pub random_bytes_length: usize,
}

/// The 17-byte super part.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SuperPart {
    pub db_type: DbType,
    pub file_size: u32,
    pub first_index_ptr: u32,
    pub total_header_block_size: usize,
    pub last_index_ptr: usize,
}

/// A closed IP range `[start, end]` returned by a lookup.
///
/// The raw bytes are in the database's native address width: 4 bytes for an
/// IPv4 file, 16 for an IPv6 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl IpRange {
    /// The range start as an address, when the stored width is 4 or 16 bytes.
    pub fn start_addr(&self) -> Option<IpAddr> {
        addr_from_bytes(&self.start)
    }

    /// The range end as an address, when the stored width is 4 or 16 bytes.
    pub fn end_addr(&self) -> Option<IpAddr> {
        addr_from_bytes(&self.end)
    }
}

fn addr_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}
