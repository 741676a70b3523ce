//! PE optional header (PE32 and PE32+).
//!
//! The optional header comes in two variants, selected by its leading magic. Both share the
//! same layout up to offset 0x47. The four stack/heap reserve and commit sizes that follow are
//! 32-bit on PE32 and 64-bit on PE32+, which shifts the loader flags, the directory count and
//! the data directory array by 16 bytes between the two variants.
//!
//! | Offset (PE32 / PE32+) | Field |
//! |-----------------------|-------|
//! | 0x48 / 0x48 | stack reserve, stack commit, heap reserve, heap commit |
//! | 0x58 / 0x68 | loader flags |
//! | 0x5C / 0x6C | number of data directories |
//! | 0x60 / 0x70 | data directory array, 8 bytes per entry |

use strum::{EnumIter, FromRepr};

use crate::{file::io::read_le_fixed, FormatError, Result};

/// Size of a single data directory entry in bytes
pub const DIRECTORY_ENTRY_SIZE: usize = 8;

/// Offset of the stack/heap size block, identical for both variants
const SIZES_OFFSET: usize = 0x48;

/// The bitness of an image, identified by the optional header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Bitness {
    /// PE32, magic 0x010B
    Bits32 = 0x010B,
    /// PE32+, magic 0x020B
    Bits64 = 0x020B,
}

impl Bitness {
    /// Maps an optional header magic to its [`Bitness`].
    ///
    /// # Errors
    /// Returns [`FormatError::BadOptionalMagic`] for any other value.
    pub fn from_magic(magic: u16) -> Result<Bitness> {
        match magic {
            0x010B => Ok(Bitness::Bits32),
            0x020B => Ok(Bitness::Bits64),
            _ => Err(FormatError::BadOptionalMagic(magic).into()),
        }
    }

    /// The optional header magic for this bitness
    #[must_use]
    pub fn magic(self) -> u16 {
        self as u16
    }

    /// Width of one stack/heap size field in bytes
    #[must_use]
    pub fn size_field_width(self) -> usize {
        match self {
            Bitness::Bits32 => 4,
            Bitness::Bits64 => 8,
        }
    }
}

/// Well-known data directory slots, by their conventional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(usize)]
pub enum DataDirectoryType {
    /// Export table
    ExportTable = 0,
    /// Import table
    ImportTable = 1,
    /// Resource table
    ResourceTable = 2,
    /// Exception table
    ExceptionTable = 3,
    /// Certificate (attribute certificate) table
    CertificateTable = 4,
    /// Base relocation table
    BaseRelocationTable = 5,
    /// Debug data
    Debug = 6,
    /// Reserved, must be zero
    Architecture = 7,
    /// Global pointer register value
    GlobalPtr = 8,
    /// Thread local storage table
    TlsTable = 9,
    /// Load configuration table
    LoadConfigTable = 10,
    /// Bound import table
    BoundImport = 11,
    /// Import address table
    Iat = 12,
    /// Delay import descriptor
    DelayImportDescriptor = 13,
    /// CLR runtime (COR20) header, the .NET metadata directory
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    Reserved = 15,
}

/// One data directory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// RVA of the referenced structure
    pub rva: u32,
    /// Size of the referenced structure
    pub size: u32,
    /// `true` if both `rva` and `size` are non-zero
    pub present: bool,
}

impl DirectoryEntry {
    /// Creates an entry, deriving the presence flag from `rva` and `size`.
    #[must_use]
    pub fn new(rva: u32, size: u32) -> DirectoryEntry {
        DirectoryEntry {
            rva,
            size,
            present: rva != 0 && size != 0,
        }
    }
}

/// The PE optional header.
///
/// Stack and heap sizes are held as `u64` for both variants; on PE32 they are the zero-extended
/// 32-bit values read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalHeader {
    /// PE32 or PE32+
    pub magic: Bitness,
    /// Linker major version
    pub major_linker_version: u8,
    /// Linker minor version
    pub minor_linker_version: u8,
    /// Sum of all code sections
    pub size_of_code: u32,
    /// Sum of all initialized data sections
    pub size_of_initialized_data: u32,
    /// Sum of all uninitialized data sections
    pub size_of_uninitialized_data: u32,
    /// RVA of the entry point, 0 if there is none
    pub address_of_entry_point: u32,
    /// RVA of the beginning of the code section
    pub base_of_code: u32,
    /// RVA of the beginning of the data section, PE32 only
    pub base_of_data: Option<u32>,
    /// Preferred load address (32-bit on PE32, 64-bit on PE32+)
    pub image_base: u64,
    /// Alignment of sections once loaded
    pub section_alignment: u32,
    /// Alignment of section data on disk
    pub file_alignment: u32,
    /// Required operating system major version
    pub major_operating_system_version: u16,
    /// Required operating system minor version
    pub minor_operating_system_version: u16,
    /// Image major version
    pub major_image_version: u16,
    /// Image minor version
    pub minor_image_version: u16,
    /// Subsystem major version
    pub major_subsystem_version: u16,
    /// Subsystem minor version
    pub minor_subsystem_version: u16,
    /// Reserved, must be zero
    pub win32_version_value: u32,
    /// Size of the loaded image
    pub size_of_image: u32,
    /// Combined size of all headers, rounded up to the file alignment
    pub size_of_headers: u32,
    /// Image checksum
    pub checksum: u32,
    /// Required subsystem
    pub subsystem: u16,
    /// DLL characteristics
    pub dll_characteristics: u16,
    /// Stack size to reserve
    pub size_of_stack_reserve: u64,
    /// Stack size to commit
    pub size_of_stack_commit: u64,
    /// Heap size to reserve
    pub size_of_heap_reserve: u64,
    /// Heap size to commit
    pub size_of_heap_commit: u64,
    /// Reserved, must be zero
    pub loader_flags: u32,
    /// Declared number of data directory entries
    pub number_of_rva_and_sizes: u32,
    /// Exactly `number_of_rva_and_sizes` data directory entries
    pub directories: Vec<DirectoryEntry>,
}

impl OptionalHeader {
    /// Reads an [`OptionalHeader`] located at `offset` in `data`.
    ///
    /// Exactly `number_of_rva_and_sizes` directory entries are decoded. Slots beyond that count
    /// are not synthesized; [`OptionalHeader::directory`] reports them as absent.
    ///
    /// # Errors
    /// Returns [`FormatError::BadOptionalMagic`] for an unknown magic, or
    /// [`crate::Error::OutOfBounds`] if the header or its directories run past the buffer.
    pub fn read(data: &[u8], offset: usize) -> Result<OptionalHeader> {
        let magic = Bitness::from_magic(read_le_fixed::<u16>(data, offset, 0x00)?)?;

        let u8_at = |field: usize| read_le_fixed::<u8>(data, offset, field);
        let u16_at = |field: usize| read_le_fixed::<u16>(data, offset, field);
        let u32_at = |field: usize| read_le_fixed::<u32>(data, offset, field);

        let (base_of_data, image_base) = match magic {
            Bitness::Bits32 => (Some(u32_at(0x18)?), u64::from(u32_at(0x1C)?)),
            Bitness::Bits64 => (None, read_le_fixed::<u64>(data, offset, 0x18)?),
        };

        let width = magic.size_field_width();
        let size_at = |index: usize| -> Result<u64> {
            let field = SIZES_OFFSET + index * width;
            match magic {
                Bitness::Bits32 => Ok(u64::from(u32_at(field)?)),
                Bitness::Bits64 => read_le_fixed::<u64>(data, offset, field),
            }
        };

        let size_of_stack_reserve = size_at(0)?;
        let size_of_stack_commit = size_at(1)?;
        let size_of_heap_reserve = size_at(2)?;
        let size_of_heap_commit = size_at(3)?;

        let loader_flags_offset = SIZES_OFFSET + 4 * width;
        let loader_flags = u32_at(loader_flags_offset)?;
        let number_of_rva_and_sizes = u32_at(loader_flags_offset + 4)?;

        let directories_offset = checked_end!(offset, loader_flags_offset + 8)?;
        let directory_count = usize::try_from(number_of_rva_and_sizes)
            .map_err(|_| malformed_error!("Directory count too large - {}", number_of_rva_and_sizes))?;

        let directories_end = directory_count
            .checked_mul(DIRECTORY_ENTRY_SIZE)
            .and_then(|len| directories_offset.checked_add(len));
        match directories_end {
            Some(end) if end <= data.len() => {}
            _ => return Err(out_of_bounds_error!()),
        }

        let mut directories = Vec::with_capacity(directory_count);
        for index in 0..directory_count {
            let entry = directories_offset + index * DIRECTORY_ENTRY_SIZE;
            directories.push(DirectoryEntry::new(
                read_le_fixed::<u32>(data, entry, 0)?,
                read_le_fixed::<u32>(data, entry, 4)?,
            ));
        }

        log::debug!(
            "Optional header {:?} with {} data directories",
            magic,
            directories.len()
        );

        Ok(OptionalHeader {
            magic,
            major_linker_version: u8_at(0x02)?,
            minor_linker_version: u8_at(0x03)?,
            size_of_code: u32_at(0x04)?,
            size_of_initialized_data: u32_at(0x08)?,
            size_of_uninitialized_data: u32_at(0x0C)?,
            address_of_entry_point: u32_at(0x10)?,
            base_of_code: u32_at(0x14)?,
            base_of_data,
            image_base,
            section_alignment: u32_at(0x20)?,
            file_alignment: u32_at(0x24)?,
            major_operating_system_version: u16_at(0x28)?,
            minor_operating_system_version: u16_at(0x2A)?,
            major_image_version: u16_at(0x2C)?,
            minor_image_version: u16_at(0x2E)?,
            major_subsystem_version: u16_at(0x30)?,
            minor_subsystem_version: u16_at(0x32)?,
            win32_version_value: u32_at(0x34)?,
            size_of_image: u32_at(0x38)?,
            size_of_headers: u32_at(0x3C)?,
            checksum: u32_at(0x40)?,
            subsystem: u16_at(0x44)?,
            dll_characteristics: u16_at(0x46)?,
            size_of_stack_reserve,
            size_of_stack_commit,
            size_of_heap_reserve,
            size_of_heap_commit,
            loader_flags,
            number_of_rva_and_sizes,
            directories,
        })
    }

    /// Returns the directory in the given well-known slot, or `None` if the image declares fewer
    /// directories than that slot requires.
    #[must_use]
    pub fn directory(&self, dir_type: DataDirectoryType) -> Option<&DirectoryEntry> {
        self.directories.get(dir_type as usize)
    }

    /// `true` for PE32+ images
    #[must_use]
    pub fn is_pe32_plus(&self) -> bool {
        self.magic == Bitness::Bits64
    }
}
