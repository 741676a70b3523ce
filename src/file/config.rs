//! Decoding configuration for [`crate::File`]
//!
//! The structural readers have no knobs; the only caller-visible choice is how `#US` entries are
//! turned into strings.

use crate::metadata::streams::UserStringEncoding;

/// Configuration for decoding an image through [`crate::File`]
///
/// The default keeps the low byte of each user string code unit, which is what existing
/// consumers of the heap expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// How entries of the `#US` heap are decoded
    pub user_string_encoding: UserStringEncoding,
}

impl DecodeOptions {
    /// Low-byte user strings, identical to [`DecodeOptions::default`]
    #[must_use]
    pub fn compatible() -> Self {
        Self::default()
    }

    /// Full UTF-16 user strings, unpaired surrogates are replaced with U+FFFD
    #[must_use]
    pub fn utf16() -> Self {
        Self {
            user_string_encoding: UserStringEncoding::Utf16,
        }
    }
}
