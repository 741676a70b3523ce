//! Metadata root header and stream directory for .NET assemblies.
//!
//! This module defines the [`Root`] struct, which represents the root metadata header and stream
//! directory as specified by ECMA-335.
//!
//! # Overview
//!
//! The metadata root is the entry point for reading .NET assembly metadata. It contains the version
//! string and the stream directory required to locate every metadata stream (such as `#~`,
//! `#Strings`, `#US`, `#Blob`, etc.). Stream headers are variable-sized, so the directory can only
//! be walked in order.
//!
//! # Example
//!
//! ```rust
//! use pescope::metadata::root::Root;
//!
//! #[rustfmt::skip]
//! let data = [
//!     0x42, 0x53, 0x4A, 0x42,
//!     0x01, 0x00,
//!     0x01, 0x00,
//!     0x00, 0x00, 0x00, 0x00,
//!     0x04, 0x00, 0x00, 0x00,
//!     b'v', b'4', 0x00, 0x00,
//!     0x00, 0x00,
//!     0x01, 0x00,
//!     0x20, 0x00, 0x00, 0x00, // StreamHeader
//!     0x08, 0x00, 0x00, 0x00,
//!     0x23, 0x55, 0x53, 0x00,
//! ];
//!
//! let root = Root::read(&data, 0)?;
//! assert_eq!(root.version_trimmed(), "v4");
//! for stream in &root.stream_headers {
//!     println!("Stream: {} (offset: {}, size: {})", stream.name, stream.offset, stream.size);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::parser::Parser,
    metadata::{cor20header::Cor20Header, streams::StreamHeader},
    pe::CoffHeader,
    FormatError, Result,
};

/// The MAGIC value indicating the CIL header (`BSJB`)
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The header of the present Metadata, providing necessary information for parsing.
///
/// The version string is kept exactly as declared: `length` bytes, each taken as a Latin-1
/// character, including any NUL padding. Use [`Root::version_trimmed`] for the text up to the
/// first NUL.
///
/// ## Reference
/// - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Magic signature for physical metadata: 0x424A5342
    pub signature: u32,
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// Always 0
    pub reserved: u32,
    /// Number of bytes allocated to hold version string
    pub length: u32,
    /// 'VersionString\0', as declared
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Number of Streams
    pub stream_number: u16,
    /// Streams, in directory order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Locates and reads the metadata root referenced by a CLR header.
    ///
    /// # Arguments
    /// * `data` - The complete file buffer
    /// * `coff` - The decoded COFF header, whose section table translates the metadata RVA
    /// * `clr`  - The decoded CLR header
    ///
    /// # Errors
    /// Returns [`crate::AddressError::RvaNotMapped`] if the metadata RVA is outside of every
    /// section, and any error of [`Root::read`] unchanged.
    pub fn locate(data: &[u8], coff: &CoffHeader, clr: &Cor20Header) -> Result<Root> {
        let offset = coff.rva_to_phys(clr.meta_data_rva)?;
        log::debug!(
            "Metadata root at RVA 0x{:X}, file offset 0x{:X}",
            clr.meta_data_rva,
            offset
        );

        Root::read(data, offset as usize)
    }

    /// Reads a [`Root`] metadata header located at `offset` within `data`.
    ///
    /// Stream header offsets are rebased onto `offset`, so [`StreamHeader::offset`] is a file
    /// offset into `data`.
    ///
    /// # Arguments
    /// * `data`   - The complete file buffer
    /// * `offset` - File offset of the `BSJB` signature
    ///
    /// # Errors
    /// Returns [`FormatError::BadMetadataSignature`] if the signature does not match,
    /// [`crate::Error::OutOfBounds`] if the header or its stream directory is truncated, or
    /// [`crate::Error::Malformed`] if an offset overflows.
    pub fn read(data: &[u8], offset: usize) -> Result<Root> {
        let root_offset = u32::try_from(offset)
            .map_err(|_| malformed_error!("Metadata root offset too large - {}", offset))?;

        let mut parser = Parser::new(data);
        parser.seek(offset)?;

        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(FormatError::BadMetadataSignature(signature).into());
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let reserved = parser.read_le::<u32>()?;
        let length = parser.read_le::<u32>()?;

        let version = parser
            .read_bytes(length as usize)?
            .iter()
            .map(|byte| char::from(*byte))
            .collect::<String>();

        let flags = parser.read_le::<u16>()?;
        let stream_number = parser.read_le::<u16>()?;

        // each stream header takes at least 12 bytes
        let capacity = usize::from(stream_number).min(parser.remaining() / 12);
        let mut stream_headers = Vec::with_capacity(capacity);
        for _ in 0..stream_number {
            stream_headers.push(StreamHeader::read(&mut parser, root_offset)?);
        }

        log::debug!(
            "Metadata root v{}.{} '{}', {} streams",
            major_version,
            minor_version,
            version.trim_end_matches('\0'),
            stream_headers.len()
        );

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_number,
            stream_headers,
        })
    }

    /// The version string up to (not including) the first NUL
    #[must_use]
    pub fn version_trimmed(&self) -> &str {
        match self.version.find('\0') {
            Some(end) => &self.version[..end],
            None => &self.version,
        }
    }

    /// Returns the first stream header named `name`
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers
            .iter()
            .find(|stream| stream.name == name)
    }
}
