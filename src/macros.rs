#![allow(unused_macros)]

/// Helper macro for returning an out-of-bounds error when a buffer is too short
///
/// ```rust, ignore
///  if data.len() < 64 {
///      return Err(out_of_bounds_error!());
///  }
/// ```
macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// Helper macro for adding a region length to a base offset without overflowing
///
/// ```rust, ignore
///  let end = checked_end!(offset, size)?;
/// ```
macro_rules! checked_end {
    ($base:expr, $len:expr) => {
        ($base as usize).checked_add($len as usize).ok_or_else(|| {
            malformed_error!(
                "Region causing integer overflow - {} + {}",
                $base,
                $len
            )
        })
    };
}
