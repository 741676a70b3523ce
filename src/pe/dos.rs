//! Legacy MZ (DOS stub) header.
//!
//! Every PE image starts with a 64-byte MS-DOS header. The only fields still relevant to a
//! modern loader are the `MZ` magic at offset 0x00 and `e_lfanew` at offset 0x3C, the file
//! offset of the PE signature. The remaining fields are decoded for completeness.

use crate::{file::io::read_le_fixed, FormatError, Result};

/// The MAGIC value indicating a DOS header (`MZ`)
pub const DOS_MAGIC: u16 = 0x5A4D;

/// Size of the DOS header in bytes
pub const DOS_HEADER_SIZE: usize = 0x40;

/// The MS-DOS stub header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosHeader {
    /// Magic number, always [`DOS_MAGIC`]
    pub magic: u16,
    /// Bytes on the last page of the file
    pub last_page_bytes: u16,
    /// Pages in the file
    pub pages_in_file: u16,
    /// Number of relocations
    pub relocations: u16,
    /// Size of the header in paragraphs
    pub header_size: u16,
    /// Minimum extra paragraphs needed
    pub min_alloc: u16,
    /// Maximum extra paragraphs needed
    pub max_alloc: u16,
    /// Initial (relative) SS value
    pub initial_ss: u16,
    /// Initial SP value
    pub initial_sp: u16,
    /// Checksum
    pub checksum: u16,
    /// Initial IP value
    pub initial_ip: u16,
    /// Initial (relative) CS value
    pub initial_cs: u16,
    /// File address of the relocation table
    pub relocation_table_address: u16,
    /// Overlay number
    pub overlay_number: u16,
    /// Reserved words
    pub reserved: [u16; 4],
    /// OEM identifier
    pub oem_id: u16,
    /// OEM information
    pub oem_info: u16,
    /// Reserved words
    pub reserved2: [u16; 10],
    /// File offset of the PE header (`e_lfanew`)
    pub pe_header_offset: u32,
}

impl DosHeader {
    /// Reads the [`DosHeader`] from the start of `data`.
    ///
    /// # Errors
    /// Returns [`FormatError::BadMagic`] if the first word is not [`DOS_MAGIC`], or
    /// [`crate::Error::OutOfBounds`] if `data` is shorter than the header.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pescope::pe::DosHeader;
    ///
    /// let mut data = [0u8; 64];
    /// data[0] = b'M';
    /// data[1] = b'Z';
    /// data[0x3C] = 0x80;
    ///
    /// let header = DosHeader::read(&data)?;
    /// assert_eq!(header.pe_header_offset, 0x80);
    /// # Ok::<(), pescope::Error>(())
    /// ```
    pub fn read(data: &[u8]) -> Result<DosHeader> {
        let magic = read_le_fixed::<u16>(data, 0, 0x00)?;
        if magic != DOS_MAGIC {
            return Err(FormatError::BadMagic(magic).into());
        }

        if data.len() < DOS_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let word = |field: usize| read_le_fixed::<u16>(data, 0, field);

        let mut reserved = [0_u16; 4];
        for (index, value) in reserved.iter_mut().enumerate() {
            *value = word(0x1C + index * 2)?;
        }

        let mut reserved2 = [0_u16; 10];
        for (index, value) in reserved2.iter_mut().enumerate() {
            *value = word(0x28 + index * 2)?;
        }

        let header = DosHeader {
            magic,
            last_page_bytes: word(0x02)?,
            pages_in_file: word(0x04)?,
            relocations: word(0x06)?,
            header_size: word(0x08)?,
            min_alloc: word(0x0A)?,
            max_alloc: word(0x0C)?,
            initial_ss: word(0x0E)?,
            initial_sp: word(0x10)?,
            checksum: word(0x12)?,
            initial_ip: word(0x14)?,
            initial_cs: word(0x16)?,
            relocation_table_address: word(0x18)?,
            overlay_number: word(0x1A)?,
            reserved,
            oem_id: word(0x24)?,
            oem_info: word(0x26)?,
            reserved2,
            pe_header_offset: read_le_fixed::<u32>(data, 0, 0x3C)?,
        };

        log::debug!(
            "DOS header decoded, PE header at 0x{:X}",
            header.pe_header_offset
        );

        Ok(header)
    }
}
