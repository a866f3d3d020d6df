//! Canonical content hashes for blobs and directory manifests
//!
//! Blob hashes are the SHA-256 of the raw file bytes with no framing.
//! Manifest hashes are computed over a fixed concatenation of each
//! child's fields in sorted-name order; that concatenation is an
//! on-disk identity shared with every existing repository, so its byte
//! layout is frozen (including the doubled created field — see
//! [`manifest_hash`]).

use crate::error::Result;
use crate::types::{ContentHash, DirEntry};
use sha2::{Digest, Sha256};
use std::io::Read;

/// Size of the read buffer for streaming blob hashing
const HASH_BUFFER_SIZE: usize = 8192;

/// Stream-hash raw blob bytes from a reader.
///
/// Uses an 8 KiB buffer so large files never need a full in-memory
/// copy.
pub fn blob_hash<R: Read>(mut reader: R) -> Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::from_bytes(hasher.finalize().into()))
}

/// Hash a directory manifest from its children.
///
/// For each child, in sorted-name order, the hasher is fed: the name
/// bytes, the child hash as lowercase hex, the created time as decimal
/// Unix seconds twice, and the is-directory flag as `true`/`false`.
/// No separators. The created time appears twice (the second write
/// was likely meant to be the modified time); every existing
/// repository is keyed by this layout, so it stays.
///
/// Callers must pass children already sorted by name; this function
/// hashes them in the order given.
#[must_use]
pub fn manifest_hash(children: &[DirEntry]) -> ContentHash {
    let mut hasher = Sha256::new();

    for child in children {
        hasher.update(child.name.as_bytes());
        hasher.update(child.hash.to_string().as_bytes());
        hasher.update(child.created.timestamp().to_string().as_bytes());
        hasher.update(child.created.timestamp().to_string().as_bytes());
        hasher.update(if child.is_dir { "true" } else { "false" }.as_bytes());
    }

    ContentHash::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local, TimeZone};

    /// SHA-256 of the five bytes `hello`
    const HELLO_HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn entry(name: &str, hash: ContentHash, is_dir: bool, secs: i64) -> DirEntry {
        let ts: DateTime<Local> = Local.timestamp_opt(secs, 0).unwrap();
        DirEntry {
            name: name.to_string(),
            hash,
            is_dir,
            created: ts,
            modified: ts,
        }
    }

    #[test]
    fn blob_hash_of_hello() {
        let hash = blob_hash(&b"hello"[..]).expect("hash");
        assert_eq!(hash.to_string(), HELLO_HASH);
    }

    #[test]
    fn blob_hash_streams_past_buffer_size() {
        let content = vec![0x42u8; HASH_BUFFER_SIZE * 3 + 7];
        let streamed = blob_hash(&content[..]).expect("hash");
        let whole = ContentHash::from_bytes(Sha256::digest(&content).into());
        assert_eq!(streamed, whole);
    }

    #[test]
    fn manifest_hash_matches_pinned_byte_layout() {
        let child_hash: ContentHash = HELLO_HASH.parse().expect("parse");
        let children = vec![entry("a.txt", child_hash, false, 1700000000)];

        // Recompute the frozen concatenation by hand: name, hex hash,
        // created seconds twice, then the flag word.
        let mut expected = Sha256::new();
        expected.update(b"a.txt");
        expected.update(HELLO_HASH.as_bytes());
        expected.update(b"1700000000");
        expected.update(b"1700000000");
        expected.update(b"false");
        let expected = ContentHash::from_bytes(expected.finalize().into());

        assert_eq!(manifest_hash(&children), expected);
    }

    #[test]
    fn manifest_hash_ignores_modified_time() {
        let child_hash: ContentHash = HELLO_HASH.parse().expect("parse");
        let mut a = entry("a.txt", child_hash, false, 1700000000);
        let b = a.clone();
        a.modified = Local.timestamp_opt(1700009999, 0).unwrap();
        assert_eq!(manifest_hash(&[a]), manifest_hash(&[b]));
    }

    #[test]
    fn manifest_hash_depends_on_created_time() {
        let child_hash: ContentHash = HELLO_HASH.parse().expect("parse");
        let a = entry("a.txt", child_hash, false, 1700000000);
        let b = entry("a.txt", child_hash, false, 1700000001);
        assert_ne!(manifest_hash(&[a]), manifest_hash(&[b]));
    }

    #[test]
    fn manifest_hash_depends_on_dir_flag() {
        let child_hash: ContentHash = HELLO_HASH.parse().expect("parse");
        let a = entry("a", child_hash, false, 1700000000);
        let b = entry("a", child_hash, true, 1700000000);
        assert_ne!(manifest_hash(&[a]), manifest_hash(&[b]));
    }

    #[test]
    fn manifest_hash_is_order_sensitive() {
        // Children must be sorted before hashing; two orders of the
        // same set hash differently.
        let child_hash: ContentHash = HELLO_HASH.parse().expect("parse");
        let a = entry("a", child_hash, false, 1700000000);
        let b = entry("b", child_hash, false, 1700000000);
        assert_ne!(
            manifest_hash(&[a.clone(), b.clone()]),
            manifest_hash(&[b, a])
        );
    }

    #[test]
    fn empty_manifest_hashes_to_empty_digest() {
        let expected = ContentHash::from_bytes(Sha256::digest(b"").into());
        assert_eq!(manifest_hash(&[]), expected);
    }
}
