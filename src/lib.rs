//! Read-only query engine for the encrypted CZDB IP-to-geolocation
//! database format.
//!
//! A CZDB file starts with a cleartext hyper header, followed by an
//! AES-ECB encrypted metadata block, random padding, and the database
//! proper: a two-level index (header table over fixed-width index blocks),
//! MessagePack record payloads, and an XOR-obfuscated column dictionary
//! shared by all records.
//!
//! ```no_run
//! use czdb_reader::CzdbReader;
//!
//! let mut reader = CzdbReader::open("data/cz88_ipv4.czdb")?;
//! reader.set_key("dGhpcyBpcyBub3QgYSByZWFsIGtleQ==");
//! let (range, text) = reader.find("1.2.3.4".parse()?)?;
//! println!("{:?} -> {}", range, text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod czdb;

pub use czdb::error::{CzdbError, Result};
pub use czdb::models::{DbType, IpRange, DATA_NOT_FOUND};
pub use czdb::CzdbReader;
