//! PE/COFF structural decoding.
//!
//! Decoding runs top-down: the [`DosHeader`] yields the offset of the PE signature, from which
//! [`CoffHeader::read`] decodes the COFF file header, the [`OptionalHeader`] (PE32 or PE32+)
//! and the [`Section`] table. [`rva_to_phys`] and [`phys_to_rva`] translate addresses through
//! that section table.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::pe::{CoffHeader, DataDirectoryType, DosHeader};
//!
//! let data = std::fs::read("tests/samples/hello.exe")?;
//! let dos = DosHeader::read(&data)?;
//! let coff = CoffHeader::read(&data, dos.pe_header_offset as usize)?;
//!
//! for section in &coff.sections {
//!     println!("{:8} 0x{:08X}", section.name, section.virtual_address);
//! }
//!
//! if let Some(optional) = &coff.optional {
//!     if let Some(clr) = optional.directory(DataDirectoryType::ClrRuntimeHeader) {
//!         println!("CLR header present: {}", clr.present);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod address;
mod coff;
mod dos;
mod optional;
mod section;

pub use address::{phys_to_rva, rva_to_phys};
pub use coff::{machine, CoffCharacteristics, CoffHeader, COFF_HEADER_SIZE, PE_MAGIC};
pub use dos::{DosHeader, DOS_HEADER_SIZE, DOS_MAGIC};
pub use optional::{Bitness, DataDirectoryType, DirectoryEntry, OptionalHeader, DIRECTORY_ENTRY_SIZE};
pub use section::{Section, SectionCharacteristics, SECTION_HEADER_SIZE};
