//! Time-ordered message identifiers.
//!
//! Ids are UUIDv7 strings. The leading 48 bits carry the Unix time in
//! milliseconds, which archive cursors rely on. A process-wide clock keeps
//! ids strictly increasing: within one millisecond the 12-bit `rand_a` field
//! counts up, and when it runs out the timestamp is advanced by one.

use parking_lot::Mutex;
use uuid::{Builder, Uuid};

const MAX_SEQ: u16 = 0x0FFF;

struct Clock {
    last_ms: u64,
    seq: u16,
}

static CLOCK: Mutex<Clock> = parking_lot::const_mutex(Clock { last_ms: 0, seq: 0 });

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Next id as a [`Uuid`].
pub fn next() -> Uuid {
    let (ms, seq) = {
        let mut clock = CLOCK.lock();
        let now = now_ms();
        if now > clock.last_ms {
            clock.last_ms = now;
            clock.seq = 0;
        } else if clock.seq == MAX_SEQ {
            clock.last_ms += 1;
            clock.seq = 0;
        } else {
            clock.seq += 1;
        }
        (clock.last_ms, clock.seq)
    };

    let mut bytes: [u8; 10] = rand::random();
    bytes[..2].copy_from_slice(&seq.to_be_bytes());
    Builder::from_unix_timestamp_millis(ms, &bytes).into_uuid()
}

/// Next id as a lowercase hyphenated string.
pub fn generate() -> String {
    next().hyphenated().to_string()
}

/// Millisecond timestamp embedded in a v7 id, or `None` if `id` is not one.
pub fn timestamp_millis(id: &str) -> Option<u64> {
    let uuid = Uuid::parse_str(id).ok()?;
    if uuid.get_version_num() != 7 {
        return None;
    }
    let b = uuid.as_bytes();
    Some(b[..6].iter().fold(0u64, |acc, &x| (acc << 8) | u64::from(x)))
}

/// True when `id` looks like an id this module produced.
pub fn is_valid(id: &str) -> bool {
    timestamp_millis(id).is_some()
}
