//! CLR header and metadata directory of .NET images.
//!
//! # Key Components
//!
//! - [`cor20header`] - The CLR (COR20) header found through data directory 14
//! - [`root`] - The `BSJB` metadata root with its version string and stream directory
//! - [`streams`] - Stream headers and the `#US` user string heap
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::File;
//!
//! let file = File::from_mem(std::fs::read("tests/samples/hello.exe")?)?;
//!
//! if let Some(root) = file.metadata_root() {
//!     println!("Runtime: {}", root.version_trimmed());
//!     for stream in &root.stream_headers {
//!         println!("{:10} 0x{:08X} {}", stream.name, stream.offset, stream.size);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of the metadata stream headers and the user string heap
pub mod streams;
