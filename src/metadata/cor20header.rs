//! CLR 2.0 (Cor20) header parsing for .NET assemblies.
//!
//! This module defines the [`Cor20Header`] struct, which represents the main header for .NET assemblies
//! as found in the IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR data directory of PE files.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;

use crate::{
    file::parser::Parser,
    pe::{CoffHeader, DataDirectoryType},
    Result,
};

/// Size of the CLR header in bytes
pub const COR20_HEADER_SIZE: usize = 72;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Runtime flags of the CLR header (`COMIMAGE_FLAGS_*`)
    pub struct CorFlags: u32 {
        /// The image only contains IL code
        const IL_ONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRE_32BIT = 0x0000_0002;
        /// The image is an IL library
        const IL_LIBRARY = 0x0000_0004;
        /// The image is strong-name signed
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point token refers to a native entry point
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Debug data is tracked
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// The image prefers to run in a 32-bit process
        const PREFER_32BIT = 0x0002_0000;
    }
}

/// The main header of CIL, located at the beginning of the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR` data
/// directory of PE files.
///
/// Fields are decoded as found; none of them is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of header in bytes
    pub cb: u32,
    /// The minimum version of runtime required to run this program
    pub major_runtime_version: u16,
    /// The minor portion of the version
    pub minor_runtime_version: u16,
    /// RVA of the `MetaData`
    pub meta_data_rva: u32,
    /// Size of the `MetaData`
    pub meta_data_size: u32,
    /// Flags describing this runtime
    pub flags: u32,
    /// Token for the `MethodDef` or File of the entry point for the image
    pub entry_point_token: u32,
    /// RVA of implementation specific resources
    pub resource_rva: u32,
    /// Size of implementation specific resources
    pub resource_size: u32,
    /// RVA of the hash data for this pe file used by the CLI loader for binding and versioning
    pub strong_name_signature_rva: u32,
    /// Size of the hash data
    pub strong_name_signature_size: u32,
    /// Always 0
    pub code_manager_table_rva: u32,
    /// Always 0
    pub code_manager_table_size: u32,
    /// RVA of an array of locations in the file that contain an array of functions pointers
    pub vtable_fixups_rva: u32,
    /// Size of an array of locations in the file that contain an array of functions pointers
    pub vtable_fixups_size: u32,
    /// Always 0
    pub export_address_table_jmp_rva: u32,
    /// Always 0
    pub export_address_table_jmp_size: u32,
    /// Always 0
    pub managed_native_header_rva: u32,
    /// Always 0
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Locates and reads the CLR header of an image.
    ///
    /// Returns `Ok(None)` if the image has no optional header (plain object files) or if its
    /// CLR runtime header directory (slot 14) is not declared or not present. Otherwise the
    /// directory RVA is translated to a file offset and the header is read from there.
    ///
    /// # Errors
    /// Returns [`crate::AddressError::RvaNotMapped`] if the directory RVA is outside of every
    /// section, or [`crate::Error::OutOfBounds`] if the header runs past the buffer.
    pub fn locate(data: &[u8], coff: &CoffHeader) -> Result<Option<Cor20Header>> {
        let Some(optional) = &coff.optional else {
            log::debug!("No optional header, image carries no CLR header");
            return Ok(None);
        };

        let directory = match optional.directory(DataDirectoryType::ClrRuntimeHeader) {
            Some(directory) if directory.present => directory,
            _ => {
                log::debug!("CLR runtime header directory absent");
                return Ok(None);
            }
        };

        let offset = coff.rva_to_phys(directory.rva)? as usize;
        log::debug!(
            "CLR header at RVA 0x{:X}, file offset 0x{:X}",
            directory.rva,
            offset
        );

        let Some(header_data) = data.get(offset..) else {
            return Err(out_of_bounds_error!());
        };

        Cor20Header::read(header_data).map(Some)
    }

    /// Create a [`Cor20Header`] object from a sequence of bytes
    ///
    /// # Arguments
    /// * `data` - The byte slice from which this object shall be created
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is too short to contain a CLR header.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        Ok(Cor20Header {
            cb: parser.read_le::<u32>()?,
            major_runtime_version: parser.read_le::<u16>()?,
            minor_runtime_version: parser.read_le::<u16>()?,
            meta_data_rva: parser.read_le::<u32>()?,
            meta_data_size: parser.read_le::<u32>()?,
            flags: parser.read_le::<u32>()?,
            entry_point_token: parser.read_le::<u32>()?,
            resource_rva: parser.read_le::<u32>()?,
            resource_size: parser.read_le::<u32>()?,
            strong_name_signature_rva: parser.read_le::<u32>()?,
            strong_name_signature_size: parser.read_le::<u32>()?,
            code_manager_table_rva: parser.read_le::<u32>()?,
            code_manager_table_size: parser.read_le::<u32>()?,
            vtable_fixups_rva: parser.read_le::<u32>()?,
            vtable_fixups_size: parser.read_le::<u32>()?,
            export_address_table_jmp_rva: parser.read_le::<u32>()?,
            export_address_table_jmp_size: parser.read_le::<u32>()?,
            managed_native_header_rva: parser.read_le::<u32>()?,
            managed_native_header_size: parser.read_le::<u32>()?,
        })
    }

    /// Typed view of [`Cor20Header::flags`]. Unknown bits are retained.
    #[must_use]
    pub fn cor_flags(&self) -> CorFlags {
        CorFlags::from_bits_retain(self.flags)
    }
}
