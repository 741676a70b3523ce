//! COFF section table.
//!
//! The section table directly follows the optional header and is an array of fixed 0x28-byte
//! descriptors. Its declaration order is preserved, as address translation depends on it.

use bitflags::bitflags;

use crate::{file::io::read_le_fixed, Result};

/// Size of a single section descriptor in bytes
pub const SECTION_HEADER_SIZE: usize = 0x28;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Section characteristics (`IMAGE_SCN_*`)
    pub struct SectionCharacteristics: u32 {
        /// The section should not be padded to the next boundary (object files only)
        const TYPE_NO_PAD = 0x0000_0008;
        /// The section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// The section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// The section contains comments or other information (object files only)
        const LNK_INFO = 0x0000_0200;
        /// The section will not become part of the image (object files only)
        const LNK_REMOVE = 0x0000_0800;
        /// The section contains COMDAT data (object files only)
        const LNK_COMDAT = 0x0000_1000;
        /// The section contains data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// The section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// The section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// The section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// The section is not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// The section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// The section can be read
        const MEM_READ = 0x4000_0000;
        /// The section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

/// One COFF section descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name, up to the first NUL byte or 8 characters
    pub name: String,
    /// Size of the section once loaded, may be 0
    pub virtual_size: u32,
    /// RVA of the first byte of the section once loaded
    pub virtual_address: u32,
    /// Size of the initialized data on disk, may be 0
    pub raw_data_size: u32,
    /// File offset of the section data
    pub raw_data_address: u32,
    /// File offset of the relocation entries
    pub relocations_address: u32,
    /// File offset of the COFF line-number entries
    pub line_numbers_address: u32,
    /// Number of relocation entries
    pub relocations_count: u16,
    /// Number of COFF line-number entries
    pub line_numbers_count: u16,
    /// Raw `IMAGE_SCN_*` flags
    pub characteristics: u32,
}

impl Section {
    /// Reads `count` consecutive section descriptors starting at `offset`.
    ///
    /// # Arguments
    /// * `data`   - The complete file buffer
    /// * `count`  - Number of sections declared by the COFF header
    /// * `offset` - File offset of the first descriptor
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the table runs past the end of `data`.
    pub fn read_table(data: &[u8], count: u16, offset: usize) -> Result<Vec<Section>> {
        let mut sections = Vec::with_capacity(usize::from(count));
        for index in 0..usize::from(count) {
            let base = checked_end!(offset, index * SECTION_HEADER_SIZE)?;
            let section = Section::read(data, base)?;

            log::trace!(
                "Section '{}' va=0x{:X}+0x{:X} raw=0x{:X}+0x{:X}",
                section.name,
                section.virtual_address,
                section.virtual_size,
                section.raw_data_address,
                section.raw_data_size
            );
            sections.push(section);
        }

        Ok(sections)
    }

    /// Reads a single section descriptor located at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the descriptor runs past the end of `data`.
    pub fn read(data: &[u8], offset: usize) -> Result<Section> {
        let end = checked_end!(offset, SECTION_HEADER_SIZE)?;
        if end > data.len() {
            return Err(out_of_bounds_error!());
        }

        let name = data[offset..offset + 8]
            .iter()
            .take_while(|byte| **byte != 0)
            .map(|byte| char::from(*byte))
            .collect();

        Ok(Section {
            name,
            virtual_size: read_le_fixed::<u32>(data, offset, 0x08)?,
            virtual_address: read_le_fixed::<u32>(data, offset, 0x0C)?,
            raw_data_size: read_le_fixed::<u32>(data, offset, 0x10)?,
            raw_data_address: read_le_fixed::<u32>(data, offset, 0x14)?,
            relocations_address: read_le_fixed::<u32>(data, offset, 0x18)?,
            line_numbers_address: read_le_fixed::<u32>(data, offset, 0x1C)?,
            relocations_count: read_le_fixed::<u16>(data, offset, 0x20)?,
            line_numbers_count: read_le_fixed::<u16>(data, offset, 0x22)?,
            characteristics: read_le_fixed::<u32>(data, offset, 0x24)?,
        })
    }

    /// Typed view of [`Section::characteristics`]. Unknown bits are retained.
    #[must_use]
    pub fn flags(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_retain(self.characteristics)
    }

    /// `true` if `rva` lies within `[virtual_address, virtual_address + virtual_size)`
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.virtual_size);

        (start..end).contains(&u64::from(rva))
    }

    /// `true` if `offset` lies within `[raw_data_address, raw_data_address + raw_data_size)`
    #[must_use]
    pub fn contains_offset(&self, offset: u32) -> bool {
        let start = u64::from(self.raw_data_address);
        let end = start + u64::from(self.raw_data_size);

        (start..end).contains(&u64::from(offset))
    }
}
