use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

const ID_BYTES: usize = 12;
const ID_HEX_LEN: usize = ID_BYTES * 2;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Store-assigned document identifier: 12 bytes, rendered as 24 hex characters.
///
/// Layout is a 4-byte big-endian seconds timestamp, 5 bytes unique to this
/// process and a 3-byte rolling counter, so ids generated by one process sort
/// roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TodoId([u8; ID_BYTES]);

impl TodoId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        let secs = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        let unique = PROCESS_UNIQUE.get_or_init(|| {
            let mut out = [0u8; 5];
            out.copy_from_slice(&Uuid::new_v4().as_bytes()[..5]);
            out
        });
        bytes[4..9].copy_from_slice(unique);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Structural check only: `None` unless `raw` is exactly 24 hex digits.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != ID_HEX_LEN {
            return None;
        }
        let mut bytes = [0u8; ID_BYTES];
        for (i, pair) in raw.as_bytes().chunks(2).enumerate() {
            bytes[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        Some(Self(bytes))
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_some()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for TodoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TodoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TodoId::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {raw}")))
    }
}
