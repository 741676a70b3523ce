//! Cursor over a byte slice for self-describing, variable-length records.
//!
//! The metadata stream directory and the `#US` heap are both sequences of records without a
//! fixed stride: every record's start depends on the exact consumed length of the one before
//! it (including name padding). [`Parser`] tracks that running position and is shared by
//! both decoders.
//!
//! # Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! let data = [0x6C, 0x00, 0x00, 0x00, b'#', b'U', b'S', 0x00, 0x04, 0x41, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u32>()?, 0x6C);
//! assert_eq!(parser.read_padded_name()?, "#US");
//! assert_eq!(parser.pos(), 8);
//! assert_eq!(parser.read_compressed_uint()?, 4);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, read_le_at, PeIO},
    Result,
};

/// A binary data parser with a position cursor and bounds-checked reads.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a value of type `T` in little-endian format and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a value of type `T` in big-endian format and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_be<T: PeIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;

        Ok(&self.data[start..self.position])
    }

    /// Read a compressed unsigned integer as used for heap entry lengths (ECMA-335 II.23.2).
    ///
    /// | Leading bits | Width | Value |
    /// |--------------|-------|-------|
    /// | `10xxxxxx`   | 2     | low 6 bits of the first byte, then the next byte |
    /// | `110xxxxx`   | 4     | low 5 bits of the first byte, then three bytes, most significant first |
    /// | anything else | 1    | the byte itself |
    ///
    /// Leading bytes of the form `111xxxxx` are not rejected; they are taken as a 1-byte literal.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the encoding is truncated.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let Some(&first_byte) = self.data.get(self.position) else {
            return Err(out_of_bounds_error!());
        };

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            return Ok(u32::from(self.read_be::<u16>()? & 0x3FFF));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            return Ok(self.read_be::<u32>()? & 0x1FFF_FFFF);
        }

        self.advance_by(1)?;
        Ok(u32::from(first_byte))
    }

    /// Read a NUL-terminated ASCII name whose storage (name plus terminator) is padded to a
    /// multiple of 4 bytes, leaving the cursor at the first byte after the padding.
    ///
    /// The padding bytes are skipped without being inspected.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found or the padding runs past
    /// the end of the data.
    pub fn read_padded_name(&mut self) -> Result<String> {
        let start = self.position;
        let Some(terminator) = self.data[start..].iter().position(|byte| *byte == 0) else {
            return Err(out_of_bounds_error!());
        };

        let name = self.data[start..start + terminator]
            .iter()
            .map(|byte| char::from(*byte))
            .collect::<String>();

        let consumed = (terminator + 1 + 3) & !3;
        self.advance_by(consumed)?;

        Ok(name)
    }
}
