use crate::constants::DNS_MAX_POINTER_OFFSET;
use std::collections::HashMap;

/// Maps the canonical (lowercased, dotted) form of a name suffix to the wire
/// offset at which it was first emitted, so that later occurrences of the
/// same suffix can be replaced with a 2-octet back-reference.
///
/// Lives only for the duration of a single `Packet::encode()` call; never
/// shared across packets or kept between calls.
#[derive(Debug, Default)]
pub struct CompressionTable {
    offsets: HashMap<String, u16>,
}

impl CompressionTable {
    pub fn new() -> Self {
        CompressionTable {
            offsets: HashMap::new(),
        }
    }

    /// Looks up a pointer target for the given canonical suffix key.
    pub fn get(&self, key: &str) -> Option<u16> {
        self.offsets.get(key).copied()
    }

    /// Records the offset at which `key` was emitted, if it's addressable by
    /// a compression pointer (offsets past the first 16KB can never be
    /// referenced, so recording them would be pointless).
    pub fn insert(&mut self, key: String, offset: usize) {
        if offset <= DNS_MAX_POINTER_OFFSET as usize {
            self.offsets.entry(key).or_insert(offset as u16);
        }
    }
}
