use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every reader in this crate fails fast: the first problem encountered is returned unchanged to
/// the caller and no partially decoded structure is produced.
///
/// # Error Categories
///
/// - [`Error::Format`] - A magic number or signature did not match (see [`FormatError`])
/// - [`Error::Address`] - An address could not be translated through the section table
///   (see [`AddressError`])
/// - [`Error::OutOfBounds`] - A field read would have reached past the end of the buffer
/// - [`Error::Malformed`] - Offsets or sizes that overflow or otherwise make no sense
///
/// # Examples
///
/// ```rust
/// use pescope::{Error, FormatError, read_dos_header};
///
/// match read_dos_header(&[0u8; 64]) {
///     Err(Error::Format(FormatError::BadMagic(magic))) => assert_eq!(magic, 0),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A magic number or signature check failed.
    #[error("{0}")]
    Format(#[from] FormatError),

    /// An address lies outside of every section.
    #[error("{0}")]
    Address(#[from] AddressError),

    /// An out of bound access was attempted while parsing the file.
    ///
    /// This is the failure surfaced by the byte access layer when a declared count or offset
    /// runs past the end of the buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The file is damaged and could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

/// Magic number mismatches, one per validated structure.
///
/// Each variant carries the value that was actually found in the buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The DOS header does not start with `MZ` (0x5A4D)
    #[error("MZ header is invalid, expected 0x5A4D, got 0x{0:04X}")]
    BadMagic(u16),

    /// The PE header does not start with `PE\0\0` (0x00004550)
    #[error("Invalid PE header signature, expected 0x00004550, got 0x{0:08X}")]
    BadSignature(u32),

    /// The optional header magic is neither 0x010B nor 0x020B
    #[error("Invalid optional header magic - 0x{0:04X}")]
    BadOptionalMagic(u16),

    /// The metadata root does not start with `BSJB` (0x424A5342)
    #[error("Invalid metadata signature, expected 0x424A5342, got 0x{0:08X}")]
    BadMetadataSignature(u32),
}

/// Address translation failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// No section covers the requested relative virtual address
    #[error("RVA 0x{0:X} is not in any section")]
    RvaNotMapped(u32),

    /// No section covers the requested file offset
    #[error("Physical offset 0x{0:X} is not in any section")]
    PhysNotMapped(u32),
}
