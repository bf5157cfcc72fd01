//! 12-byte object ids, rendered as 24 lowercase hex characters.
//!
//! Layout: 4-byte big-endian unix seconds, 5 bytes of per-process
//! randomness, 3-byte big-endian counter.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use rand::Rng;

pub const OBJECT_ID_LEN: usize = 12;

static COUNTER: AtomicU32 = AtomicU32::new(0);
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let unique = PROCESS_UNIQUE.get_or_init(|| rand::thread_rng().gen());
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Seconds since the epoch at which the id was generated.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::Length(s.len()));
        }
        let decoded = hex::decode(s).map_err(|_| ObjectIdError::NotHex)?;
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectIdError {
    #[error("object id must be 24 hex characters, got {0}")]
    Length(usize),
    #[error("object id is not valid hex")]
    NotHex,
}
