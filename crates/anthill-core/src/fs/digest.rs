//! Content digests for manifest artifacts.
//!
//! Bundles are keyed by MD5 on the content service, so their digest must be
//! MD5 to match remote records. Scripts are compared through the BLAKE3 of
//! their text.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

const CHUNK_SIZE: usize = 4096;

/// Stream a file through MD5, returning the lowercase hex digest and size.
pub fn md5_file(path: &Path) -> io::Result<(String, u64)> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok((format!("{:x}", hasher.finalize()), size))
}

/// BLAKE3 hex digest of a script's text.
pub fn text_digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}
