use std::env;
use std::net::IpAddr;

use czdb_reader::CzdbReader;

const USAGE: &str = "usage: czdb-reader <db.czdb> <base64-key> <ip>";

fn main() {
    let mut args = env::args().skip(1);
    let path = args.next().expect(USAGE);
    let key = args.next().expect(USAGE);
    let ip: IpAddr = args
        .next()
        .expect(USAGE)
        .parse()
        .expect("query is not a valid IP address");

    let mut reader = CzdbReader::open(&path).expect("failed to open database");
    println!("database version: {}", reader.version());
    reader.set_key(key);

    let (range, text) = reader.find(ip).expect("lookup failed");
    match (range.start_addr(), range.end_addr()) {
        (Some(start), Some(end)) => println!("range: {} - {}", start, end),
        _ => println!("range: {:?} - {:?}", range.start, range.end),
    }
    println!("geo: {}", text.replace('\t', " | "));
}
