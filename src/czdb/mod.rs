//! Core CZDB reader module

pub mod error;
pub mod models;

mod arena;
mod crypto;
mod geo;
mod header;
mod search;

use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::OnceLock;

use log::{info, trace};

use arena::Arena;
use geo::GeoData;
use models::{
    DbType, HyperHeader, IpRange, DATA_NOT_FOUND, HYPER_HEADER_LENGTH, V4_MAPPED_LAST,
    V4_MAPPED_ZERO,
};
pub use error::{CzdbError, Result};

/// Everything built by one-shot initialization: decrypted metadata facts,
/// the header table cache and the geo dictionary. Immutable once published.
#[derive(Debug)]
struct Database {
    db_type: DbType,
    /// Image offset of the super part; every pointer in the format is
    /// relative to this position.
    base_offset: usize,
    ip_length: usize,
    index_block_length: usize,
    client_id: u32,
    expiration_date: u32,
    header_ips: Vec<[u8; 16]>,
    header_ptrs: Vec<usize>,
    geo: GeoData,
}

/// Read-only query engine for one CZDB database file.
///
/// Lifecycle: `open` loads the whole file into memory and parses the
/// cleartext hyper header, `set_key` supplies the base64 decryption key,
/// and the first `find` triggers one-shot initialization (metadata
/// decryption, header table and dictionary load). After that the reader is
/// immutable and `find` may be called from many threads at once.
///
/// Initialization runs exactly once per loaded image; its outcome, success
/// or failure, is cached and replayed to every caller. The only exception
/// is a missing key, which is reported before the latch so the key can
/// still be supplied afterwards.
#[derive(Debug)]
pub struct CzdbReader {
    key: String,
    arena: Arena,
    hyper: HyperHeader,
    state: OnceLock<std::result::Result<Database, CzdbError>>,
}

impl CzdbReader {
    /// Open a database file, reading it fully into memory.
    ///
    /// Only the cleartext hyper header is parsed here; everything behind
    /// the encrypted metadata waits for a key and the first `find`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("opening CZDB file: {}", path.display());
        let arena = Arena::new(fs::read(path)?);

        let hyper = header::parse_hyper_header(&arena)?;
        if arena.len() < HYPER_HEADER_LENGTH + hyper.encrypted_data_length {
            return Err(CzdbError::InvalidDatabase(format!(
                "file size {} is smaller than the declared {} bytes of encrypted metadata",
                arena.len(),
                hyper.encrypted_data_length
            )));
        }

        info!(
            "CZDB file opened: version={}, client_id={}, {} bytes",
            hyper.version,
            hyper.client_id,
            arena.len()
        );
        Ok(Self {
            key: String::new(),
            arena,
            hyper,
            state: OnceLock::new(),
        })
    }

    /// Supply the base64-encoded decryption key.
    ///
    /// Must happen before the first successful `find`; replacing the key
    /// after initialization has no effect.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// Database build stamp from the hyper header (decimal "YYYYMMDD").
    pub fn version(&self) -> u32 {
        self.hyper.version
    }

    /// Licensed client id from the decrypted metadata.
    /// `None` until initialization has succeeded.
    pub fn client_id(&self) -> Option<u32> {
        self.database().map(|db| db.client_id)
    }

    /// Expiration stamp from the decrypted metadata (decimal "YYMMDD").
    /// The reader never enforces it; expiry policy belongs to the caller.
    /// `None` until initialization has succeeded.
    pub fn expiration_date(&self) -> Option<u32> {
        self.database().map(|db| db.expiration_date)
    }

    /// Whether the database stores IPv4 ranges.
    /// `false` until initialization has succeeded.
    pub fn is_ipv4(&self) -> bool {
        self.database().map(|db| db.db_type == DbType::Ipv4).unwrap_or(false)
    }

    /// Whether the database stores IPv6 ranges.
    /// `false` until initialization has succeeded.
    pub fn is_ipv6(&self) -> bool {
        self.database().map(|db| db.db_type == DbType::Ipv6).unwrap_or(false)
    }

    /// Look up the range covering `ip` and its geo attribute text.
    ///
    /// The returned range carries raw addresses in the database's native
    /// width; the text is the TAB-joined selected columns followed by a TAB
    /// and the record's inline tail. The two documented coverage gaps of
    /// the official database (the zero address of either family, and the
    /// whole IPv4-mapped space in IPv6 files) return the sentinel text
    /// `"DataNotFound"` as a success.
    pub fn find(&self, ip: IpAddr) -> Result<(IpRange, String)> {
        // Checked outside the init latch: a missing key must not consume
        // the one-shot, so the caller can still supply one and retry.
        if self.state.get().is_none() && self.key.is_empty() {
            return Err(CzdbError::KeyRequired);
        }
        let db = match self.state.get_or_init(|| self.init()) {
            Ok(db) => db,
            Err(err) => return Err(err.clone()),
        };

        let query = normalize_query(ip, db.db_type)?;
        trace!("find {} (normalized to {} bytes)", ip, query.len());

        let bracket =
            search::search_header(&db.header_ips, &db.header_ptrs, db.index_block_length, &query);
        let Some((sptr, eptr)) = bracket else {
            // The official database ships without 0.0.0.0/32 and ::/128
            // records; the zero address of the native family is the only
            // query allowed to sort before the whole header table.
            if query.iter().all(|&b| b == 0) {
                let range = IpRange {
                    start: query.clone(),
                    end: query,
                };
                return Ok((range, DATA_NOT_FOUND.to_string()));
            }
            return Err(CzdbError::InvalidDatabase(
                "no header block covers the query address".to_string(),
            ));
        };

        let hit = search::search_index(
            &self.arena,
            db.base_offset,
            sptr,
            eptr,
            db.ip_length,
            db.index_block_length,
            &query,
        )?;
        let Some(hit) = hit else {
            // IPv6 databases skip the IPv4-mapped space entirely.
            if db.db_type == DbType::Ipv6 && query[..] == V4_MAPPED_ZERO {
                let range = IpRange {
                    start: vec![0u8; 16],
                    end: V4_MAPPED_LAST.to_vec(),
                };
                return Ok((range, DATA_NOT_FOUND.to_string()));
            }
            return Err(CzdbError::InvalidDatabase(
                "no index block covers the query address".to_string(),
            ));
        };

        let payload = self.arena.slice(db.base_offset + hit.data_ptr, hit.data_length)?;
        let text = db.geo.parse_geo_info(payload)?;
        Ok((
            IpRange {
                start: hit.start_ip,
                end: hit.end_ip,
            },
            text,
        ))
    }

    /// Release the file image and every derived cache, resetting the init
    /// latch. The key is kept; subsequent queries report `InvalidDatabase`
    /// against the empty image.
    pub fn close(&mut self) {
        info!("closing CZDB reader");
        self.arena.clear();
        self.state = OnceLock::new();
    }

    fn database(&self) -> Option<&Database> {
        match self.state.get() {
            Some(Ok(db)) => Some(db),
            _ => None,
        }
    }

    fn init(&self) -> std::result::Result<Database, CzdbError> {
        let key_bytes = header::decode_key(&self.key)?;
        let metadata = header::decrypt_metadata(&self.arena, &self.hyper, &key_bytes)?;
        let base_offset =
            HYPER_HEADER_LENGTH + self.hyper.encrypted_data_length + metadata.random_bytes_length;

        let super_part = header::parse_super_part(&self.arena, base_offset)?;
        let (header_ips, header_ptrs) = header::parse_header_blocks(
            &self.arena,
            base_offset,
            super_part.total_header_block_size,
        )?;
        let geo = header::load_geo_data(&self.arena, base_offset, &super_part, &self.key)?;

        info!(
            "initialized {:?} database: {} header entries, expires {}",
            super_part.db_type,
            header_ips.len(),
            metadata.expiration_date
        );
        Ok(Database {
            db_type: super_part.db_type,
            base_offset,
            ip_length: super_part.db_type.ip_length(),
            index_block_length: super_part.db_type.index_block_length(),
            client_id: metadata.client_id,
            expiration_date: metadata.expiration_date,
            header_ips,
            header_ptrs,
            geo,
        })
    }
}

/// Normalize the query to the database's native width: `to4` against IPv4
/// files (accepting IPv4-mapped IPv6 addresses), `to16` against IPv6 files.
fn normalize_query(ip: IpAddr, db_type: DbType) -> Result<Vec<u8>> {
    match (db_type, ip) {
        (DbType::Ipv4, IpAddr::V4(v4)) => Ok(v4.octets().to_vec()),
        (DbType::Ipv4, IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => Ok(v4.octets().to_vec()),
            None => Err(CzdbError::InvalidDatabase(format!(
                "IPv6 address {} cannot be searched in an IPv4 database",
                v6
            ))),
        },
        (DbType::Ipv6, IpAddr::V4(v4)) => Ok(v4.to_ipv6_mapped().octets().to_vec()),
        (DbType::Ipv6, IpAddr::V6(v6)) => Ok(v6.octets().to_vec()),
    }
}
