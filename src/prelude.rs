//! # pescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the pescope
//! library. Import this module to get quick access to the decoding pipeline.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::{AddressError, Error, FormatError};

/// The result type used throughout pescope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Owning facade over a decoded image, and its options
pub use crate::{DecodeOptions, File};

/// Cursor for variable-length records
pub use crate::Parser;

/// Pipeline stages as free functions
pub use crate::{
    read_clr_header, read_dos_header, read_metadata_root, read_pe_header, read_user_string_heap,
};

// ================================================================================================
// PE Structures
// ================================================================================================

/// DOS, COFF and optional headers
pub use crate::pe::{Bitness, CoffHeader, DataDirectoryType, DirectoryEntry, DosHeader, OptionalHeader};

/// Section table and typed flag views
pub use crate::pe::{CoffCharacteristics, Section, SectionCharacteristics};

// ================================================================================================
// Metadata
// ================================================================================================

/// CLR header
pub use crate::metadata::cor20header::{Cor20Header, CorFlags};

/// Metadata root constants and structure
pub use crate::metadata::root::{Root, CIL_HEADER_MAGIC};

/// Streams and the user string heap
pub use crate::metadata::streams::{StreamHeader, StreamKind, UserStringEncoding, UserStrings};
