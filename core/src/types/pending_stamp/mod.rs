use crate::types::key::TrashKey;
use crate::types::record::latest::Pending;
use redb::TypeName;
use std::cmp::Ordering;
use std::time::{Duration, SystemTime};

/// Width of the encoded `started_at` prefix: seconds (8) then nanoseconds (4),
/// both big-endian.
const STARTED_AT_LEN: usize = 12;

/// When an in-flight operation on `key` began.
///
/// Encoded as a fixed-width big-endian instant followed by the key's UTF-8
/// bytes, so plain byte order is `(started_at, key)` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStamp {
    pub started_at: SystemTime,
    pub key: TrashKey,
}

impl PendingStamp {
    pub fn of(pending: &Pending) -> Self {
        Self {
            started_at: pending.started_at,
            key: pending.entry.key.clone(),
        }
    }
}

fn encode_started_at(at: SystemTime) -> [u8; STARTED_AT_LEN] {
    // Instants before the epoch sort first.
    let since_epoch = at.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let mut out = [0; STARTED_AT_LEN];
    out[..8].copy_from_slice(&since_epoch.as_secs().to_be_bytes());
    out[8..].copy_from_slice(&since_epoch.subsec_nanos().to_be_bytes());
    out
}

fn decode_started_at(prefix: &[u8; STARTED_AT_LEN]) -> SystemTime {
    let (secs, nanos) = prefix.split_at(8);
    let secs = u64::from_be_bytes(secs.try_into().expect("eight second bytes"));
    let nanos = u32::from_be_bytes(nanos.try_into().expect("four nanosecond bytes"));
    SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
}

impl redb::Key for PendingStamp {
    fn compare(data1: &[u8], data2: &[u8]) -> Ordering {
        data1.cmp(data2)
    }
}

impl redb::Value for PendingStamp {
    type SelfType<'a> = PendingStamp;
    type AsBytes<'a> = Vec<u8>;

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        let (prefix, key) = data
            .split_first_chunk::<STARTED_AT_LEN>()
            .expect("pending stamp shorter than its instant prefix");

        PendingStamp {
            started_at: decode_started_at(prefix),
            key: <TrashKey as redb::Value>::from_bytes(key),
        }
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'b,
    {
        [
            encode_started_at(value.started_at).as_slice(),
            value.key.as_bytes(),
        ]
        .concat()
    }

    fn type_name() -> TypeName {
        TypeName::new("reclaim::PendingStamp")
    }
}
