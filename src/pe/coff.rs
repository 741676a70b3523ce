//! PE signature, COFF file header and the structures it owns.
//!
//! The COFF header is the root of the structural view of an image: it embeds the optional
//! header (when present) and the section table, and the address translation helpers operate
//! on it.

use bitflags::bitflags;

use crate::{
    file::io::read_le_fixed,
    pe::{
        address::{phys_to_rva, rva_to_phys},
        optional::OptionalHeader,
        section::Section,
    },
    FormatError, Result,
};

/// The MAGIC value indicating a PE header (`PE\0\0`)
pub const PE_MAGIC: u32 = 0x0000_4550;

/// Size of the PE signature plus COFF file header in bytes
pub const COFF_HEADER_SIZE: usize = 0x18;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// COFF file characteristics (`IMAGE_FILE_*`)
    pub struct CoffCharacteristics: u16 {
        /// Base relocations have been stripped
        const RELOCS_STRIPPED = 0x0001;
        /// The image is valid and can be run
        const EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers have been removed (deprecated)
        const LINE_NUMS_STRIPPED = 0x0004;
        /// COFF local symbols have been removed (deprecated)
        const LOCAL_SYMS_STRIPPED = 0x0008;
        /// Aggressively trim working set (obsolete)
        const AGGRESSIVE_WS_TRIM = 0x0010;
        /// The application can handle addresses above 2 GB
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// Little endian (deprecated)
        const BYTES_REVERSED_LO = 0x0080;
        /// The machine is based on a 32-bit word architecture
        const MACHINE_32BIT = 0x0100;
        /// Debugging information is removed from the image
        const DEBUG_STRIPPED = 0x0200;
        /// Copy the image to swap when run from removable media
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        /// Copy the image to swap when run from network media
        const NET_RUN_FROM_SWAP = 0x0800;
        /// The image is a system file
        const SYSTEM = 0x1000;
        /// The image is a dynamic-link library
        const DLL = 0x2000;
        /// The file should only be run on a uniprocessor machine
        const UP_SYSTEM_ONLY = 0x4000;
        /// Big endian (deprecated)
        const BYTES_REVERSED_HI = 0x8000;
    }
}

/// Commonly encountered `IMAGE_FILE_MACHINE_*` values
pub mod machine {
    /// Unknown or any machine
    pub const UNKNOWN: u16 = 0x0000;
    /// Intel 386 and compatible
    pub const I386: u16 = 0x014C;
    /// ARM little endian
    pub const ARM: u16 = 0x01C0;
    /// ARM Thumb-2 little endian
    pub const ARMNT: u16 = 0x01C4;
    /// x64
    pub const AMD64: u16 = 0x8664;
    /// ARM64 little endian
    pub const ARM64: u16 = 0xAA64;
}

/// The PE signature and COFF file header, with the optional header and section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoffHeader {
    /// Signature, always [`PE_MAGIC`]
    pub magic: u32,
    /// Target machine, see [`machine`]
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Link time, seconds since the Unix epoch
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, 0 if absent
    pub pointer_to_symbol_table: u32,
    /// Number of entries in the COFF symbol table
    pub number_of_symbols: u32,
    /// Size of the optional header, 0 for object files
    pub size_of_optional_header: u16,
    /// Raw `IMAGE_FILE_*` flags
    pub characteristics: u16,
    /// The optional header, present iff `size_of_optional_header != 0`
    pub optional: Option<OptionalHeader>,
    /// The section table in declaration order, `number_of_sections` long
    pub sections: Vec<Section>,
}

impl CoffHeader {
    /// Reads the PE signature and everything it governs, starting at `offset`.
    ///
    /// `offset` is normally [`crate::pe::DosHeader::pe_header_offset`]. The optional header is
    /// read at `offset + 0x18` if its declared size is non-zero, and the section table at
    /// `offset + 0x18 + size_of_optional_header`.
    ///
    /// # Errors
    /// Returns [`FormatError::BadSignature`] if the signature is not [`PE_MAGIC`], any error of
    /// [`OptionalHeader::read`] unchanged, or [`crate::Error::OutOfBounds`] if a structure runs
    /// past the buffer.
    pub fn read(data: &[u8], offset: usize) -> Result<CoffHeader> {
        let magic = read_le_fixed::<u32>(data, offset, 0x00)?;
        if magic != PE_MAGIC {
            return Err(FormatError::BadSignature(magic).into());
        }

        let number_of_sections = read_le_fixed::<u16>(data, offset, 0x06)?;
        let size_of_optional_header = read_le_fixed::<u16>(data, offset, 0x14)?;

        let optional_offset = checked_end!(offset, COFF_HEADER_SIZE)?;
        let optional = if size_of_optional_header != 0 {
            Some(OptionalHeader::read(data, optional_offset)?)
        } else {
            None
        };

        let sections_offset = checked_end!(optional_offset, size_of_optional_header)?;
        let sections = Section::read_table(data, number_of_sections, sections_offset)?;

        log::debug!(
            "COFF header decoded, {} sections, optional header {}",
            sections.len(),
            if optional.is_some() { "present" } else { "absent" }
        );

        Ok(CoffHeader {
            magic,
            machine: read_le_fixed::<u16>(data, offset, 0x04)?,
            number_of_sections,
            time_date_stamp: read_le_fixed::<u32>(data, offset, 0x08)?,
            pointer_to_symbol_table: read_le_fixed::<u32>(data, offset, 0x0C)?,
            number_of_symbols: read_le_fixed::<u32>(data, offset, 0x10)?,
            size_of_optional_header,
            characteristics: read_le_fixed::<u16>(data, offset, 0x16)?,
            optional,
            sections,
        })
    }

    /// Typed view of [`CoffHeader::characteristics`]. Unknown bits are retained.
    #[must_use]
    pub fn flags(&self) -> CoffCharacteristics {
        CoffCharacteristics::from_bits_retain(self.characteristics)
    }

    /// Converts a relative virtual address into a file offset, see [`rva_to_phys`].
    ///
    /// # Errors
    /// Returns [`crate::AddressError::RvaNotMapped`] if no section covers `rva`.
    pub fn rva_to_phys(&self, rva: u32) -> Result<u32> {
        rva_to_phys(&self.sections, rva)
    }

    /// Converts a file offset into a relative virtual address, failing with
    /// [`crate::Error::Malformed`] when the result would be negative; see [`phys_to_rva`].
    ///
    /// # Errors
    /// Returns [`crate::AddressError::PhysNotMapped`] if no section covers `phys`, or
    /// [`crate::Error::Malformed`] if the translated RVA is outside of `u32`.
    pub fn phys_to_rva(&self, phys: u32) -> Result<u32> {
        phys_to_rva(&self.sections, phys)
    }
}
