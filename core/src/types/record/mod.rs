//! Versioned records persisted in the ledger.
//!
//! Every record is postcard-encoded behind a one-byte version tag so older
//! databases keep decoding after the layout changes.

use redb::TypeName;
pub use v1 as latest;

pub mod v1;

pub trait RecordVariant {
    const VERSION: u8;
}

macro_rules! versioned_record {
    ($name:ident, $inner:ident, $type_name:literal) => {
        #[derive(Debug, Clone)]
        pub enum $name {
            V1(v1::$inner),
        }

        impl $name {
            pub fn into_latest(self) -> v1::$inner {
                match self {
                    $name::V1(record) => record,
                }
            }
        }

        impl From<v1::$inner> for $name {
            fn from(record: v1::$inner) -> Self {
                $name::V1(record)
            }
        }

        impl redb::Value for $name {
            type SelfType<'a> = $name;
            type AsBytes<'a> = Vec<u8>;

            fn fixed_width() -> Option<usize> {
                None
            }

            fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
            where
                Self: 'a,
            {
                let (version, data) = data.split_first().expect("empty record");
                const V1: u8 = <v1::$inner as RecordVariant>::VERSION;
                match *version {
                    V1 => $name::V1(
                        postcard::from_bytes::<v1::$inner>(data).expect("invalid record"),
                    ),
                    version => panic!("unsupported record version: {}", version),
                }
            }

            fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
            where
                Self: 'b,
            {
                match value {
                    $name::V1(record) => postcard::to_extend(
                        record,
                        vec![<v1::$inner as RecordVariant>::VERSION],
                    )
                    .expect("record serialization failed"),
                }
            }

            fn type_name() -> TypeName {
                TypeName::new($type_name)
            }
        }
    };
}

versioned_record!(VersionedEntry, Entry, "reclaim::Entry");
versioned_record!(VersionedPending, Pending, "reclaim::Pending");
versioned_record!(VersionedAudit, OverrideAudit, "reclaim::OverrideAudit");
