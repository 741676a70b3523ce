//! PE file abstraction and decoding pipeline.
//!
//! This module owns the byte buffer of an image and runs the structural readers over it in order:
//! DOS header, PE signature with COFF header, optional header and section table, then (if the
//! image carries one) the CLR header and the metadata root.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - Owns the buffer and the decoded headers
//! - [`crate::file::parser::Parser`] - Cursor over a byte slice for variable-length records
//! - [`crate::file::io`] - Bounds-checked little/big endian primitive reads
//! - [`crate::file::config::DecodeOptions`] - Caller-visible decoding choices
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::File;
//!
//! let file = File::from_mem(std::fs::read("tests/samples/hello.exe")?)?;
//!
//! println!("Number of sections: {}", file.sections().len());
//! if let Some(clr) = file.clr() {
//!     let offset = file.rva_to_offset(clr.meta_data_rva as usize)?;
//!     println!("Metadata at file offset 0x{:x}", offset);
//! }
//!
//! if let Some(strings) = file.user_strings()? {
//!     for string in strings {
//!         println!("{string}");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # References
//!
//! - Microsoft PE/COFF Specification
//! - ECMA-335 6th Edition, Partition II - PE File Format

pub mod config;
pub mod io;
pub mod parser;

use crate::{
    file::config::DecodeOptions,
    metadata::{
        cor20header::Cor20Header,
        root::Root,
        streams::{StreamKind, UserStrings},
    },
    pe::{CoffHeader, DosHeader, OptionalHeader, Section},
    Result,
};

/// A decoded PE image.
///
/// All headers are decoded eagerly by [`File::from_mem`]; the first failure aborts loading and is
/// returned unchanged. Images without a CLR runtime header (native executables, object files)
/// load fine, with [`File::clr`] and [`File::metadata_root`] returning `None`.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::File;
///
/// let file = File::from_mem(std::fs::read("tests/samples/hello.exe")?)?;
///
/// for section in file.sections() {
///     if section.name == ".text" {
///         println!("Code section at RVA 0x{:x}", section.virtual_address);
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct File {
    data: Vec<u8>,
    options: DecodeOptions,
    dos: DosHeader,
    coff: CoffHeader,
    clr: Option<Cor20Header>,
    root: Option<Root>,
}

impl File {
    /// Loads a PE image from a memory buffer, using [`DecodeOptions::default`].
    ///
    /// # Arguments
    ///
    /// * `data` - The bytes of the PE file.
    ///
    /// # Errors
    ///
    /// Returns the first error of the header readers, see [`crate::Error`].
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::from_mem_with(data, DecodeOptions::default())
    }

    /// Loads a PE image from a memory buffer with explicit [`DecodeOptions`].
    ///
    /// # Errors
    ///
    /// Returns the first error of the header readers, see [`crate::Error`].
    pub fn from_mem_with(data: Vec<u8>, options: DecodeOptions) -> Result<File> {
        let dos = DosHeader::read(&data)?;
        let coff = CoffHeader::read(&data, dos.pe_header_offset as usize)?;

        let clr = Cor20Header::locate(&data, &coff)?;
        let root = match &clr {
            Some(clr) => Some(Root::locate(&data, &coff, clr)?),
            None => None,
        };

        log::debug!(
            "Loaded image of {} bytes, {} sections, managed: {}",
            data.len(),
            coff.sections.len(),
            root.is_some()
        );

        Ok(File {
            data,
            options,
            dos,
            coff,
            clr,
            root,
        })
    }

    /// Copies `data` and loads it, see [`File::from_mem`].
    ///
    /// # Errors
    ///
    /// Returns the first error of the header readers, see [`crate::Error`].
    pub fn parse(data: &[u8]) -> Result<File> {
        Self::from_mem(data.to_vec())
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The options this file was loaded with
    #[must_use]
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Returns the DOS header.
    #[must_use]
    pub fn header_dos(&self) -> &DosHeader {
        &self.dos
    }

    /// Returns the COFF header, which also holds the optional header and the section table.
    #[must_use]
    pub fn header(&self) -> &CoffHeader {
        &self.coff
    }

    /// Returns the optional header, if the image has one.
    #[must_use]
    pub fn header_optional(&self) -> Option<&OptionalHeader> {
        self.coff.optional.as_ref()
    }

    /// Returns the section table in declaration order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.coff.sections
    }

    /// Returns the CLR header, if the image is managed.
    #[must_use]
    pub fn clr(&self) -> Option<&Cor20Header> {
        self.clr.as_ref()
    }

    /// Returns the metadata root, if the image is managed.
    #[must_use]
    pub fn metadata_root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    /// Returns the raw data of the loaded file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a slice of the file data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = checked_end!(offset, len)?;

        self.data.get(offset..end).ok_or(out_of_bounds_error!())
    }

    /// Converts a relative virtual address (RVA) to a file offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AddressError::RvaNotMapped`] if no section covers `rva`, or
    /// [`crate::Error::Malformed`] if `rva` does not fit into 32 bits.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva = u32::try_from(rva)
            .map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        Ok(self.coff.rva_to_phys(rva)? as usize)
    }

    /// Converts a file offset to a relative virtual address (RVA). Unlike the RVA direction, this
    /// can fail with [`crate::Error::Malformed`] for a mapped offset, see [`crate::pe::phys_to_rva`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::AddressError::PhysNotMapped`] if no section covers `offset`, or
    /// [`crate::Error::Malformed`] if `offset` does not fit into 32 bits or the translated RVA
    /// would be negative or exceed 32 bits.
    pub fn offset_to_rva(&self, offset: usize) -> Result<usize> {
        let offset = u32::try_from(offset)
            .map_err(|_| malformed_error!("Offset too large to fit in u32: {}", offset))?;

        Ok(self.coff.phys_to_rva(offset)? as usize)
    }

    /// Decodes the `#US` heap with the encoding from [`File::options`].
    ///
    /// Returns `Ok(None)` if the image is not managed or its metadata has no `#US` stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the heap or one of its entries runs past the
    /// buffer.
    pub fn user_strings(&self) -> Result<Option<Vec<String>>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };

        let Some(header) = root
            .stream_headers
            .iter()
            .find(|stream| stream.kind() == StreamKind::UserStrings)
        else {
            return Ok(None);
        };

        UserStrings::decode(&self.data, header, self.options.user_string_encoding).map(Some)
    }
}
