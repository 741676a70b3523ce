//! Bounds-checked, endian-aware reads of primitive values from byte buffers.
//!
//! Every fixed-layout structure in this crate (DOS header, COFF header, optional header, section
//! descriptors, COR20 header, metadata root) is decoded by reading individual fields through the
//! functions in this module. A read that would reach past the end of the buffer fails with
//! [`crate::Error::OutOfBounds`] instead of panicking.
//!
//! # Examples
//!
//! ```rust
//! use pescope::file::io::{read_le, read_le_at};
//!
//! let data = [0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00];
//! assert_eq!(read_le::<u16>(&data)?, 0x5A4D);
//!
//! let mut offset = 4;
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 3);
//! assert_eq!(offset, 8);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be decoded from a fixed number of bytes.
///
/// The associated `Bytes` type is the fixed-size array matching the width of the implementing
/// type (e.g. `[u8; 4]` for `u32`).
pub trait PeIO: Sized {
    /// Byte array type for this numeric type
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_pe_io {
    ($($ty:ty),*) => {
        $(
            impl PeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_pe_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: PeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a value of type `T` in little-endian byte order at `offset`, advancing `offset` by the
/// width of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes. `offset` is left
/// untouched in that case.
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();

    Ok(T::from_le_bytes(bytes))
}

/// Reads a value of type `T` in big-endian byte order at `offset`, advancing `offset` by the
/// width of `T`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();

    Ok(T::from_be_bytes(bytes))
}

/// Reads a little-endian value at a fixed position, without an offset cursor.
///
/// This is the accessor used by the fixed-offset header readers, where every field sits at a
/// documented position relative to the start of its structure.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_fixed<T: PeIO>(data: &[u8], base: usize, field: usize) -> Result<T> {
    let Some(mut offset) = base.checked_add(field) else {
        return Err(OutOfBounds);
    };

    read_le_at(data, &mut offset)
}

fn take<T: PeIO>(data: &[u8], offset: usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    Ok(read)
}
