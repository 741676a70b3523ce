//! Stream Header for .NET Metadata Streams
//!
//! Provides parsing and access to stream headers, which describe the name, offset, and size of each metadata stream in a .NET assembly.
//! This module exposes the [`StreamHeader`] struct for reading stream header information.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::parser::Parser, Result};

/// The well-known kinds of metadata streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// `#Strings`, UTF-8 identifier heap
    Strings,
    /// `#US`, user string heap
    UserStrings,
    /// `#Blob`, binary heap
    Blob,
    /// `#GUID`, GUID heap
    Guid,
    /// `#~`, compressed metadata tables
    Tables,
    /// `#-`, uncompressed (edit-and-continue) metadata tables
    UncompressedTables,
    /// Any other name
    Unknown,
}

/// A stream header provides the names, and the position and length of a particular table or heap. Note that the
/// length of a Stream header structure is not fixed, but depends on the length of its name field (a variable
/// length null-terminated string, padded to a 4-byte boundary).
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Absolute file offset of the stream (metadata root offset plus the declared relative offset)
    pub offset: u32,
    /// Size of this stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Reads one stream header at the parser's position and leaves the parser at the start of
    /// the next one.
    ///
    /// # Arguments
    /// * `parser`      - Cursor positioned at the start of the stream header
    /// * `root_offset` - File offset of the metadata root, added to the declared relative offset
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header is truncated, or
    /// [`crate::Error::Malformed`] if the absolute offset does not fit into 32 bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pescope::{metadata::streams::StreamHeader, Parser};
    ///
    /// let data = [0x6C, 0x00, 0x00, 0x00, 0xA4, 0x45, 0x00, 0x00, 0x23, 0x7E, 0x00, 0x00];
    /// let mut parser = Parser::new(&data);
    ///
    /// let header = StreamHeader::read(&mut parser, 0x1000)?;
    /// assert_eq!(header.offset, 0x106C);
    /// assert_eq!(header.name, "#~");
    /// assert_eq!(parser.pos(), 12);
    /// # Ok::<(), pescope::Error>(())
    /// ```
    pub fn read(parser: &mut Parser<'_>, root_offset: u32) -> Result<StreamHeader> {
        let relative_offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;
        let name = parser.read_padded_name()?;

        let Some(offset) = root_offset.checked_add(relative_offset) else {
            return Err(malformed_error!(
                "Stream offset causing integer overflow - {} + {}",
                root_offset,
                relative_offset
            ));
        };

        log::trace!(
            "Stream '{}' at 0x{:X}, {} bytes",
            name,
            offset,
            size
        );

        Ok(StreamHeader { offset, size, name })
    }

    /// Classifies the stream by its name
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        match self.name.as_str() {
            "#Strings" => StreamKind::Strings,
            "#US" => StreamKind::UserStrings,
            "#Blob" => StreamKind::Blob,
            "#GUID" => StreamKind::Guid,
            "#~" => StreamKind::Tables,
            "#-" => StreamKind::UncompressedTables,
            _ => StreamKind::Unknown,
        }
    }

    /// Returns the bytes of this stream within the complete file buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream does not fit into `data`.
    pub fn data<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.offset as usize;
        let end = checked_end!(start, self.size)?;

        data.get(start..end).ok_or(out_of_bounds_error!())
    }
}
