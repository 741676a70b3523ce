//! User String Heap (`#US`) for .NET Metadata
//!
//! The `#US` heap is a sequence of entries, each a compressed length prefix followed by that many
//! bytes of UTF-16LE code units (plus, by convention, one trailing flag byte). Entries carry no
//! alignment padding, so each one starts exactly where the previous one ended.
//!
//! Two decodings are offered through [`UserStringEncoding`]:
//! - [`UserStringEncoding::LowByte`] keeps only the low byte of every code unit. This is lossy for
//!   anything outside of Latin-1, and is the default because existing consumers depend on it.
//! - [`UserStringEncoding::Utf16`] decodes the code units as UTF-16, replacing unpaired
//!   surrogates with U+FFFD.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use widestring::U16Str;

use crate::{file::parser::Parser, metadata::streams::StreamHeader, Result};

/// How the UTF-16 payload of a user string entry is turned into a [`String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStringEncoding {
    /// Keep the low byte of each code unit as a Latin-1 character
    #[default]
    LowByte,
    /// Full UTF-16LE decoding
    Utf16,
}

/// Sequential access to the entries of a `#US` heap.
///
/// # Examples
///
/// ```rust
/// use pescope::metadata::streams::{UserStringEncoding, UserStrings};
///
/// let heap = [0x00, 0x05, 0x41, 0x00, 0x42, 0x00, 0x00];
/// let strings = UserStrings::from(&heap)
///     .iter(UserStringEncoding::LowByte)
///     .collect::<pescope::Result<Vec<_>>>()?;
///
/// assert_eq!(strings, vec!["".to_string(), "AB".to_string()]);
/// # Ok::<(), pescope::Error>(())
/// ```
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.4
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Create a [`UserStrings`] view over the raw bytes of a `#US` heap
    #[must_use]
    pub fn from(data: &'a [u8]) -> UserStrings<'a> {
        UserStrings { data }
    }

    /// Decodes every entry of the `#US` stream described by `header`.
    ///
    /// The stream name is not checked; selecting the `#US` stream is up to the caller. Decoding
    /// stops when the cursor reaches the declared stream size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream lies outside of `data` or an entry
    /// runs past the end of the stream.
    pub fn decode(
        data: &[u8],
        header: &StreamHeader,
        encoding: UserStringEncoding,
    ) -> Result<Vec<String>> {
        let strings = UserStrings::from(header.data(data)?)
            .iter(encoding)
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Decoded {} user strings from '{}' ({:?})",
            strings.len(),
            header.name,
            encoding
        );

        Ok(strings)
    }

    /// Iterate over the heap entries in order, starting at offset 0.
    #[must_use]
    pub fn iter(&self, encoding: UserStringEncoding) -> UserStringsIter<'a> {
        UserStringsIter {
            parser: Parser::new(self.data),
            encoding,
            failed: false,
        }
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the heap holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Iterator over the entries of a `#US` heap, see [`UserStrings::iter`].
///
/// After the first error the iterator is exhausted.
pub struct UserStringsIter<'a> {
    parser: Parser<'a>,
    encoding: UserStringEncoding,
    failed: bool,
}

impl UserStringsIter<'_> {
    fn next_entry(&mut self) -> Result<String> {
        let length = self.parser.read_compressed_uint()? as usize;
        let bytes = self.parser.read_bytes(length)?;

        Ok(decode_entry(bytes, self.encoding))
    }
}

impl Iterator for UserStringsIter<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.parser.has_more_data() {
            return None;
        }

        let entry = self.next_entry();
        self.failed = entry.is_err();

        Some(entry)
    }
}

/// Turns the payload of one entry into a string. A trailing odd byte is not part of any code
/// unit and is dropped.
fn decode_entry(bytes: &[u8], encoding: UserStringEncoding) -> String {
    let pairs = bytes.chunks_exact(2);

    match encoding {
        UserStringEncoding::LowByte => pairs.map(|pair| char::from(pair[0])).collect(),
        UserStringEncoding::Utf16 => {
            let units = pairs
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect::<Vec<u16>>();

            U16Str::from_slice(&units).to_string_lossy()
        }
    }
}
