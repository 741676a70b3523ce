//! Translation between relative virtual addresses and file offsets.
//!
//! Both directions scan the section table in declaration order. When sections overlap, which
//! only happens for malformed images, the last matching section wins.

use crate::{pe::section::Section, AddressError, Result};

/// Converts a relative virtual address into a file offset.
///
/// A section matches if `rva` lies within `[VirtualAddress, VirtualAddress + VirtualSize)`.
/// The result is `rva - VirtualAddress + RawDataAddress` of the last matching section.
///
/// # Errors
/// Returns [`AddressError::RvaNotMapped`] if no section covers `rva`, or
/// [`crate::Error::Malformed`] if the translated offset does not fit into 32 bits.
///
/// # Example
///
/// ```rust
/// use pescope::pe::{rva_to_phys, Section};
///
/// let text = Section {
///     name: ".text".to_string(),
///     virtual_size: 0x500,
///     virtual_address: 0x1000,
///     raw_data_size: 0x500,
///     raw_data_address: 0x400,
///     relocations_address: 0,
///     line_numbers_address: 0,
///     relocations_count: 0,
///     line_numbers_count: 0,
///     characteristics: 0,
/// };
///
/// assert_eq!(rva_to_phys(&[text], 0x1200)?, 0x600);
/// # Ok::<(), pescope::Error>(())
/// ```
pub fn rva_to_phys(sections: &[Section], rva: u32) -> Result<u32> {
    let section = last_match(sections, |section| section.contains_rva(rva))
        .ok_or(AddressError::RvaNotMapped(rva))?;

    let phys = u64::from(rva) - u64::from(section.virtual_address)
        + u64::from(section.raw_data_address);

    u32::try_from(phys).map_err(|_| {
        malformed_error!(
            "RVA 0x{:X} translates beyond 32-bit file offset - 0x{:X}",
            rva,
            phys
        )
    })
}

/// Converts a file offset into a relative virtual address, failing with
/// [`crate::Error::Malformed`] when the result would be negative or exceed 32 bits.
///
/// A section matches if `phys` lies within `[RawDataAddress, RawDataAddress + RawDataSize)`.
/// The result is `phys - RawDataSize + VirtualAddress` of the last matching section. This is
/// not the inverse of [`rva_to_phys`]: the raw data *size* is subtracted, not its address.
/// Existing consumers rely on this formula, so it is kept as is.
///
/// # Errors
/// Returns [`AddressError::PhysNotMapped`] if no section covers `phys`, or
/// [`crate::Error::Malformed`] if the formula yields a value outside of `u32`.
pub fn phys_to_rva(sections: &[Section], phys: u32) -> Result<u32> {
    let section = last_match(sections, |section| section.contains_offset(phys))
        .ok_or(AddressError::PhysNotMapped(phys))?;

    let rva = i64::from(phys) - i64::from(section.raw_data_size)
        + i64::from(section.virtual_address);

    u32::try_from(rva).map_err(|_| {
        malformed_error!(
            "Physical offset 0x{:X} translates outside of the RVA space - {}",
            phys,
            rva
        )
    })
}

fn last_match<F>(sections: &[Section], predicate: F) -> Option<&Section>
where
    F: Fn(&Section) -> bool,
{
    let mut found = None;
    for section in sections.iter().filter(|section| predicate(section)) {
        if let Some(previous) = found.replace(section) {
            log::warn!(
                "Sections '{}' and '{}' overlap, using the latter",
                previous.name,
                section.name
            );
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn section(name: &str, va: u32, vsize: u32, raw: u32, raw_size: u32) -> Section {
        Section {
            name: name.to_string(),
            virtual_size: vsize,
            virtual_address: va,
            raw_data_size: raw_size,
            raw_data_address: raw,
            relocations_address: 0,
            line_numbers_address: 0,
            relocations_count: 0,
            line_numbers_count: 0,
            characteristics: 0,
        }
    }

    #[test]
    fn rva_in_section() {
        let sections = [section(".text", 0x1000, 0x500, 0x400, 0x500)];

        assert_eq!(rva_to_phys(&sections, 0x1200).unwrap(), 0x600);
        assert_eq!(rva_to_phys(&sections, 0x1000).unwrap(), 0x400);
        assert_eq!(rva_to_phys(&sections, 0x14FF).unwrap(), 0x8FF);
    }

    #[test]
    fn rva_not_mapped() {
        let sections = [section(".text", 0x1000, 0x500, 0x400, 0x500)];

        assert!(matches!(
            rva_to_phys(&sections, 0x1500),
            Err(Error::Address(AddressError::RvaNotMapped(0x1500)))
        ));
        assert!(matches!(
            rva_to_phys(&[], 0x1000),
            Err(Error::Address(AddressError::RvaNotMapped(0x1000)))
        ));
    }

    #[test]
    fn zero_sized_section_never_matches() {
        let sections = [section(".bss", 0x1000, 0, 0x400, 0)];

        assert!(rva_to_phys(&sections, 0x1000).is_err());
        assert!(phys_to_rva(&sections, 0x400).is_err());
    }

    #[test]
    fn overlap_last_wins() {
        let sections = [
            section(".a", 0x1000, 0x1000, 0x400, 0x1000),
            section(".b", 0x1800, 0x1000, 0x3000, 0x1000),
        ];

        assert_eq!(rva_to_phys(&sections, 0x1900).unwrap(), 0x3100);
        assert_eq!(rva_to_phys(&sections, 0x1100).unwrap(), 0x500);
    }

    #[test]
    fn phys_overlap_last_wins() {
        let sections = [
            section(".a", 0x1000, 0x1000, 0x400, 0x1000),
            section(".b", 0x5000, 0x1000, 0x800, 0x1000),
        ];

        // 0x900 lies in both raw ranges, .b is later in the table
        assert_eq!(phys_to_rva(&sections, 0x900).unwrap(), 0x4900);
        assert_eq!(phys_to_rva(&sections, 0x500).unwrap(), 0x500);
        assert_eq!(phys_to_rva(&sections, 0x1500).unwrap(), 0x5500);
    }

    #[test]
    fn phys_uses_raw_size_formula() {
        let sections = [section(".text", 0x1000, 0x500, 0x400, 0x500)];

        // 0x600 - 0x500 + 0x1000, not the inverse of rva_to_phys
        assert_eq!(phys_to_rva(&sections, 0x600).unwrap(), 0x1100);

        let sections = [section(".text", 0x2000, 0x200, 0x200, 0x400)];
        assert_eq!(phys_to_rva(&sections, 0x300).unwrap(), 0x1F00);
    }

    #[test]
    fn phys_not_mapped() {
        let sections = [section(".text", 0x1000, 0x500, 0x400, 0x500)];

        assert!(matches!(
            phys_to_rva(&sections, 0x900),
            Err(Error::Address(AddressError::PhysNotMapped(0x900)))
        ));
    }

    #[test]
    fn phys_negative_result() {
        let sections = [section(".odd", 0x0, 0x100, 0x10, 0x1000)];

        assert!(matches!(
            phys_to_rva(&sections, 0x20),
            Err(Error::Malformed { .. })
        ));
    }
}
