//! Metadata streams for .NET assemblies.
//!
//! The metadata root is followed by a directory of [`StreamHeader`]s, one per stream. Each names
//! a stream and gives its position and size:
//!
//! - **`#Strings`** - UTF-8 identifier heap
//! - **`#US`** - UTF-16 user string heap, decoded by [`UserStrings`]
//! - **`#Blob`** - binary heap of signatures and attribute data
//! - **`#GUID`** - sequence of 128-bit GUIDs
//! - **`#~`** / **`#-`** - metadata tables
//!
//! # Examples
//!
//! ```rust
//! use pescope::metadata::streams::{StreamHeader, UserStringEncoding, UserStrings};
//!
//! let data = [0x00, 0x05, 0x48, 0x00, 0x69, 0x00, 0x00];
//! let header = StreamHeader { offset: 0, size: 7, name: "#US".to_string() };
//!
//! let strings = UserStrings::decode(&data, &header, UserStringEncoding::default())?;
//! assert_eq!(strings[1], "Hi");
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers
//! - ECMA-335 6th Edition, Partition II, Section 24.2.4 - `#US` and `#Blob` heaps

mod streamheader;
mod userstrings;

pub use streamheader::{StreamHeader, StreamKind};
pub use userstrings::{UserStringEncoding, UserStrings, UserStringsIter};
