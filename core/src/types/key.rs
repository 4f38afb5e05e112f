use nutype::nutype;
use redb::TypeName;
use std::cmp::Ordering;
use std::str;

pub const MAX_PATH_LENGTH: usize = 1024;
pub const MAX_KEY_LENGTH: usize = MAX_BUCKET_LENGTH + 1 + MAX_PATH_LENGTH;
pub const MAX_BUCKET_LENGTH: usize = 63;
pub const MAX_ACTOR_LENGTH: usize = 256;
pub const MAX_JUSTIFICATION_LENGTH: usize = 2000;

/// Identifies a trashed group. Derived from the group's original location, so it
/// stays the same across failed restore attempts.
#[nutype(
    new_unchecked,
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_KEY_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Into,
        Hash,
        Borrow,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct TrashKey(String);

impl TrashKey {
    pub fn derive(bucket: &Bucket, path: &ObjectPath) -> Self {
        // SAFETY: both halves are validated and non-empty, and their joined length
        // stays within MAX_KEY_LENGTH.
        unsafe { Self::new_unchecked(format!("{bucket}/{path}")) }
    }

    /// Directory name of this key inside the trash bucket.
    pub fn trash_slot(&self) -> String {
        blake3::hash(self.as_bytes()).to_hex().to_string()
    }
}

impl redb::Key for TrashKey {
    fn compare(data1: &[u8], data2: &[u8]) -> Ordering {
        let s1 = str::from_utf8(data1).expect("invalid UTF-8 in key");
        let s2 = str::from_utf8(data2).expect("invalid UTF-8 in key");

        s1.cmp(s2)
    }
}

impl redb::Value for TrashKey {
    type SelfType<'a> = Self;
    type AsBytes<'a> = &'a [u8];

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        let s = str::from_utf8(data).expect("invalid UTF-8 in key");
        Self::try_from(s).unwrap()
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'b,
    {
        value.as_bytes()
    }

    fn type_name() -> TypeName {
        TypeName::new("reclaim::TrashKey")
    }
}

fn is_valid_bucket(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
        && !s.starts_with('.')
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_BUCKET_LENGTH, predicate = is_valid_bucket),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct Bucket(String);

fn trim_slashes(s: String) -> String {
    s.trim().trim_matches('/').to_string()
}

fn is_valid_path(s: &str) -> bool {
    !s.contains('\\')
        && s
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Object key prefix inside a bucket, e.g. `publisher-a/book-b`.
#[nutype(
    sanitize(with = trim_slashes),
    validate(not_empty, len_char_max = MAX_PATH_LENGTH, predicate = is_valid_path),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn join(&self, child: &str) -> Result<Self, ObjectPathError> {
        Self::try_new(format!("{self}/{child}"))
    }
}

/// Caller identity supplied by the authentication layer.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_ACTOR_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        AsRef,
        Deref,
        TryFrom,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct Actor(String);

/// Written reason for an override. Blank text never validates.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = MAX_JUSTIFICATION_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        AsRef,
        Deref,
        TryFrom,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct Justification(String);

#[cfg(test)]
mod tests;
