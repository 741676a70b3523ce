// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # pescope
//!
//! Structural decoding of PE/COFF images and the CLR metadata directory of .NET assemblies,
//! in pure Rust and without any platform dependencies.
//!
//! Given the complete bytes of an image, `pescope` decodes:
//!
//! - the MS-DOS stub header and the offset of the PE signature
//! - the COFF file header, the PE32 / PE32+ optional header with its data directories, and the
//!   section table
//! - relative virtual address <-> file offset translation through the section table
//! - the CLR (COR20) header, if the image is managed
//! - the `BSJB` metadata root with its version string and stream directory
//! - the entries of the `#US` user string heap
//!
//! Every reader is a pure function of the buffer. The first problem encountered is returned as an
//! [`Error`]; no partially decoded structure is ever handed out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let file = File::from_mem(std::fs::read("tests/samples/hello.exe")?)?;
//!
//! if let Some(root) = file.metadata_root() {
//!     println!("Metadata version: {}", root.version_trimmed());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Step by step
//!
//! The individual pipeline stages are available as free functions:
//!
//! ```rust,no_run
//! use pescope::{
//!     read_clr_header, read_dos_header, read_metadata_root, read_pe_header,
//!     read_user_string_heap,
//! };
//!
//! let data = std::fs::read("tests/samples/hello.exe")?;
//!
//! let dos = read_dos_header(&data)?;
//! let coff = read_pe_header(&data, dos.pe_header_offset as usize)?;
//! if let Some(clr) = read_clr_header(&data, &coff)? {
//!     let root = read_metadata_root(&data, &coff, &clr)?;
//!     if let Some(us) = root.stream("#US") {
//!         for string in read_user_string_heap(&data, us)? {
//!             println!("{string}");
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`pe`] - DOS header, COFF header, optional header, section table and address translation
//! - [`metadata`] - CLR header, metadata root, stream headers and the user string heap
//! - [`file`] - The [`File`] facade, the [`Parser`] cursor and primitive reads
//! - [`prelude`] - Convenient re-exports of commonly used types
//!
//! ## Logging
//!
//! Decoding stages report through the [`log`](https://docs.rs/log) facade (`debug` per stage,
//! `trace` per section and stream, `warn` for overlapping sections). No logger is installed by
//! this crate.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run file --release
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Buffer ownership, cursor and primitive reads
pub mod file;

/// PE/COFF structures and address translation
pub mod pe;

/// CLR header and metadata directory
pub mod metadata;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let file = File::from_mem_with(
///     std::fs::read("tests/samples/hello.exe")?,
///     DecodeOptions::utf16(),
/// )?;
/// println!("{:?}", file.user_strings()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod prelude;

/// `pescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type, with its format and address translation categories
pub use error::{AddressError, Error, FormatError};

/// Low-level parsing utilities and the file facade
pub use file::{config::DecodeOptions, parser::Parser, File};

/// Stream headers and the user string heap
pub use metadata::streams::{StreamHeader, UserStringEncoding, UserStrings};

use metadata::{cor20header::Cor20Header, root::Root};
use pe::{CoffHeader, DosHeader};

/// Reads the MS-DOS header at the start of `data`.
///
/// # Errors
/// Returns [`FormatError::BadMagic`] if `data` does not start with `MZ`, or
/// [`Error::OutOfBounds`] if it is shorter than the header.
pub fn read_dos_header(data: &[u8]) -> Result<DosHeader> {
    DosHeader::read(data)
}

/// Reads the PE signature, COFF header, optional header and section table at `offset`.
///
/// `offset` is normally [`DosHeader::pe_header_offset`].
///
/// # Errors
/// See [`CoffHeader::read`].
pub fn read_pe_header(data: &[u8], offset: usize) -> Result<CoffHeader> {
    CoffHeader::read(data, offset)
}

/// Locates and reads the CLR header, `Ok(None)` if the image carries no .NET metadata.
///
/// # Errors
/// See [`Cor20Header::locate`].
pub fn read_clr_header(data: &[u8], coff: &CoffHeader) -> Result<Option<Cor20Header>> {
    Cor20Header::locate(data, coff)
}

/// Locates and reads the metadata root referenced by `clr`.
///
/// # Errors
/// See [`Root::locate`].
pub fn read_metadata_root(data: &[u8], coff: &CoffHeader, clr: &Cor20Header) -> Result<Root> {
    Root::locate(data, coff, clr)
}

/// Decodes every entry of the user string heap described by `header`, keeping the low byte of
/// each UTF-16 code unit. Use [`UserStrings::decode`] to choose another [`UserStringEncoding`].
///
/// # Errors
/// See [`UserStrings::decode`].
pub fn read_user_string_heap(data: &[u8], header: &StreamHeader) -> Result<Vec<String>> {
    UserStrings::decode(data, header, UserStringEncoding::LowByte)
}
