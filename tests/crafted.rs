//! End-to-end decoding of synthesized PE32 / PE32+ images.
//!
//! The images are laid out as follows:
//!
//! | File offset | RVA    | Content                                  |
//! |-------------|--------|------------------------------------------|
//! | 0x000       |        | DOS header, `e_lfanew` = 0x80            |
//! | 0x080       |        | PE signature, COFF header, optional header, section table |
//! | 0x200       | 0x2000 | `.text`: 8 zero bytes, CLR header, metadata root and streams |

use pescope::{
    metadata::{cor20header::CorFlags, root::CIL_HEADER_MAGIC, streams::StreamKind},
    pe::{machine, Bitness, DataDirectoryType, SectionCharacteristics},
    read_clr_header, read_dos_header, read_metadata_root, read_pe_header, read_user_string_heap,
    AddressError, DecodeOptions, Error, File, FormatError, UserStringEncoding, UserStrings,
};

const PE_OFFSET: usize = 0x80;
const OPTIONAL_OFFSET: usize = PE_OFFSET + 0x18;
const TEXT_RVA: u32 = 0x2000;
const TEXT_RAW: u32 = 0x200;
const CLR_RVA: u32 = TEXT_RVA + 0x08;
const ROOT_RVA: u32 = TEXT_RVA + 0x50;
const VERSION: &[u8; 12] = b"v4.0.30319\0\0";

struct ImageBuilder {
    pe32_plus: bool,
    managed: bool,
    user_strings: Vec<String>,
}

impl ImageBuilder {
    fn new() -> Self {
        ImageBuilder {
            pe32_plus: false,
            managed: true,
            user_strings: vec!["Hello".to_string(), "World".to_string()],
        }
    }

    fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    fn native(mut self) -> Self {
        self.managed = false;
        self
    }

    fn user_strings(mut self, strings: &[&str]) -> Self {
        self.user_strings = strings.iter().map(|s| (*s).to_string()).collect();
        self
    }

    fn optional_size(&self) -> usize {
        if self.pe32_plus {
            0x70 + 16 * 8
        } else {
            0x60 + 16 * 8
        }
    }

    fn us_heap(&self) -> Vec<u8> {
        let mut heap = vec![0x00];
        for string in &self.user_strings {
            let units = string.encode_utf16().collect::<Vec<u16>>();
            let length = units.len() * 2 + 1;
            if length < 0x80 {
                heap.push(length as u8);
            } else {
                heap.push(0x80 | (length >> 8) as u8);
                heap.push(length as u8);
            }
            for unit in &units {
                heap.extend_from_slice(&unit.to_le_bytes());
            }
            heap.push(u8::from(units.iter().any(|unit| *unit >= 0x80)));
        }
        heap
    }

    /// Metadata root followed by the `#~`, `#Strings` and `#US` streams
    fn metadata(&self) -> Vec<u8> {
        let tables = vec![0u8; 24];
        let mut strings = b"\0<Module>\0".to_vec();
        pad4(&mut strings);
        let us = self.us_heap();

        let header_len = 16 + VERSION.len() + 4 + (8 + 4) + (8 + 12) + (8 + 4);
        let tables_offset = header_len;
        let strings_offset = tables_offset + tables.len();
        let us_offset = strings_offset + strings.len();

        let mut root = Vec::new();
        root.extend_from_slice(&CIL_HEADER_MAGIC.to_le_bytes());
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&0_u32.to_le_bytes());
        root.extend_from_slice(&(VERSION.len() as u32).to_le_bytes());
        root.extend_from_slice(VERSION);
        root.extend_from_slice(&0_u16.to_le_bytes());
        root.extend_from_slice(&3_u16.to_le_bytes());

        for (offset, size, name) in [
            (tables_offset, tables.len(), &b"#~\0\0"[..]),
            (strings_offset, strings.len(), &b"#Strings\0\0\0\0"[..]),
            (us_offset, us.len(), &b"#US\0"[..]),
        ] {
            root.extend_from_slice(&(offset as u32).to_le_bytes());
            root.extend_from_slice(&(size as u32).to_le_bytes());
            root.extend_from_slice(name);
        }
        assert_eq!(root.len(), header_len);

        root.extend_from_slice(&tables);
        root.extend_from_slice(&strings);
        root.extend_from_slice(&us);
        root
    }

    fn clr_header(&self, metadata_size: usize) -> Vec<u8> {
        let mut clr = Vec::with_capacity(72);
        clr.extend_from_slice(&72_u32.to_le_bytes());
        clr.extend_from_slice(&2_u16.to_le_bytes());
        clr.extend_from_slice(&5_u16.to_le_bytes());
        clr.extend_from_slice(&ROOT_RVA.to_le_bytes());
        clr.extend_from_slice(&(metadata_size as u32).to_le_bytes());
        clr.extend_from_slice(&CorFlags::IL_ONLY.bits().to_le_bytes());
        clr.extend_from_slice(&0x0600_0001_u32.to_le_bytes());
        clr.resize(72, 0);
        clr
    }

    fn build(&self) -> Vec<u8> {
        let mut text = vec![0u8; 0x08];
        if self.managed {
            let metadata = self.metadata();
            text.extend_from_slice(&self.clr_header(metadata.len()));
            assert_eq!(text.len() as u32, ROOT_RVA - TEXT_RVA);
            text.extend_from_slice(&metadata);
        }
        let virtual_size = text.len() as u32;
        text.resize(text.len().div_ceil(0x200) * 0x200, 0);

        let mut data = vec![0u8; TEXT_RAW as usize];

        // DOS header
        data[0..2].copy_from_slice(b"MZ");
        data[0x02..0x04].copy_from_slice(&0x90_u16.to_le_bytes());
        data[0x04..0x06].copy_from_slice(&3_u16.to_le_bytes());
        data[0x08..0x0A].copy_from_slice(&4_u16.to_le_bytes());
        data[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

        // COFF header
        let characteristics: u16 = if self.pe32_plus { 0x0022 } else { 0x0102 };
        let machine_type = if self.pe32_plus { machine::AMD64 } else { machine::I386 };
        let coff = &mut data[PE_OFFSET..PE_OFFSET + 0x18];
        coff[0x00..0x04].copy_from_slice(b"PE\0\0");
        coff[0x04..0x06].copy_from_slice(&machine_type.to_le_bytes());
        coff[0x06..0x08].copy_from_slice(&1_u16.to_le_bytes());
        coff[0x08..0x0C].copy_from_slice(&0x6543_2100_u32.to_le_bytes());
        coff[0x14..0x16].copy_from_slice(&(self.optional_size() as u16).to_le_bytes());
        coff[0x16..0x18].copy_from_slice(&characteristics.to_le_bytes());

        // Optional header
        let optional = &mut data[OPTIONAL_OFFSET..OPTIONAL_OFFSET + self.optional_size()];
        let magic = if self.pe32_plus { Bitness::Bits64 } else { Bitness::Bits32 };
        optional[0x00..0x02].copy_from_slice(&magic.magic().to_le_bytes());
        optional[0x02] = 0x30;
        optional[0x03] = 0x01;
        optional[0x04..0x08].copy_from_slice(&0x200_u32.to_le_bytes());
        optional[0x10..0x14].copy_from_slice(&0x2100_u32.to_le_bytes());
        optional[0x14..0x18].copy_from_slice(&TEXT_RVA.to_le_bytes());
        if self.pe32_plus {
            optional[0x18..0x20].copy_from_slice(&0x1_4000_0000_u64.to_le_bytes());
        } else {
            optional[0x18..0x1C].copy_from_slice(&0x4000_u32.to_le_bytes());
            optional[0x1C..0x20].copy_from_slice(&0x0040_0000_u32.to_le_bytes());
        }
        optional[0x20..0x24].copy_from_slice(&0x2000_u32.to_le_bytes());
        optional[0x24..0x28].copy_from_slice(&0x200_u32.to_le_bytes());
        optional[0x30..0x32].copy_from_slice(&4_u16.to_le_bytes());
        optional[0x32..0x34].copy_from_slice(&7_u16.to_le_bytes());
        optional[0x44..0x46].copy_from_slice(&3_u16.to_le_bytes());

        let sizes = 0x48;
        let width = if self.pe32_plus { 8 } else { 4 };
        optional[sizes..sizes + width].copy_from_slice(&0x10_0000_u64.to_le_bytes()[..width]);
        let count_offset = sizes + 4 * width + 4;
        optional[count_offset..count_offset + 4].copy_from_slice(&16_u32.to_le_bytes());
        if self.managed {
            let clr_entry = count_offset + 4 + 14 * 8;
            optional[clr_entry..clr_entry + 4].copy_from_slice(&CLR_RVA.to_le_bytes());
            optional[clr_entry + 4..clr_entry + 8].copy_from_slice(&72_u32.to_le_bytes());
        }

        // Section table
        let section_offset = OPTIONAL_OFFSET + self.optional_size();
        let section = &mut data[section_offset..section_offset + 0x28];
        section[0..5].copy_from_slice(b".text");
        section[0x08..0x0C].copy_from_slice(&virtual_size.to_le_bytes());
        section[0x0C..0x10].copy_from_slice(&TEXT_RVA.to_le_bytes());
        section[0x10..0x14].copy_from_slice(&(text.len() as u32).to_le_bytes());
        section[0x14..0x18].copy_from_slice(&TEXT_RAW.to_le_bytes());
        section[0x24..0x28].copy_from_slice(&0x6000_0020_u32.to_le_bytes());

        data.extend_from_slice(&text);
        data
    }
}

fn pad4(data: &mut Vec<u8>) {
    data.resize(data.len().div_ceil(4) * 4, 0);
}

fn rva_to_file(rva: u32) -> usize {
    (rva - TEXT_RVA + TEXT_RAW) as usize
}

#[test]
fn pe32_pipeline() {
    let file = File::from_mem(ImageBuilder::new().build()).unwrap();

    let dos = file.header_dos();
    assert_eq!(dos.pe_header_offset, PE_OFFSET as u32);
    assert_eq!(dos.last_page_bytes, 0x90);
    assert_eq!(dos.pages_in_file, 3);

    let coff = file.header();
    assert_eq!(coff.machine, machine::I386);
    assert_eq!(coff.number_of_sections, 1);
    assert_eq!(coff.time_date_stamp, 0x6543_2100);

    let optional = file.header_optional().unwrap();
    assert_eq!(optional.magic, Bitness::Bits32);
    assert!(!optional.is_pe32_plus());
    assert_eq!(optional.major_linker_version, 0x30);
    assert_eq!(optional.minor_linker_version, 0x01);
    assert_eq!(optional.image_base, 0x0040_0000);
    assert_eq!(optional.base_of_data, Some(0x4000));
    assert_eq!(optional.major_subsystem_version, 4);
    assert_eq!(optional.minor_subsystem_version, 7);
    assert_eq!(optional.size_of_stack_reserve, 0x10_0000);
    assert_eq!(optional.number_of_rva_and_sizes, 16);
    assert_eq!(optional.directories.len(), 16);

    let clr_directory = optional
        .directory(DataDirectoryType::ClrRuntimeHeader)
        .unwrap();
    assert!(clr_directory.present);
    assert_eq!(clr_directory.rva, CLR_RVA);
    assert_eq!(clr_directory.size, 72);
    assert!(!optional
        .directory(DataDirectoryType::ImportTable)
        .unwrap()
        .present);

    let text = &file.sections()[0];
    assert_eq!(text.name, ".text");
    assert!(text
        .flags()
        .contains(SectionCharacteristics::CNT_CODE | SectionCharacteristics::MEM_EXECUTE));

    let clr = file.clr().unwrap();
    assert_eq!(clr.cb, 72);
    assert_eq!(clr.major_runtime_version, 2);
    assert_eq!(clr.minor_runtime_version, 5);
    assert_eq!(clr.meta_data_rva, ROOT_RVA);
    assert_eq!(clr.cor_flags(), CorFlags::IL_ONLY);
    assert_eq!(clr.entry_point_token, 0x0600_0001);

    let root = file.metadata_root().unwrap();
    assert_eq!(root.signature, CIL_HEADER_MAGIC);
    assert_eq!(root.length, 12);
    assert_eq!(root.version_trimmed(), "v4.0.30319");
    assert_eq!(root.stream_number, 3);

    let names = root
        .stream_headers
        .iter()
        .map(|stream| stream.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["#~", "#Strings", "#US"]);
    assert_eq!(root.stream_headers[0].kind(), StreamKind::Tables);

    // stream offsets are absolute file offsets
    let root_offset = rva_to_file(ROOT_RVA) as u32;
    assert_eq!(root.stream_headers[0].offset, root_offset + 76);
    assert_eq!(root.stream_headers[1].offset, root_offset + 100);
    assert_eq!(root.stream_headers[2].offset, root_offset + 112);
    assert_eq!(
        root.stream("#Strings").unwrap().data(file.data()).unwrap(),
        b"\0<Module>\0\0\0"
    );

    assert_eq!(
        file.user_strings().unwrap().unwrap(),
        vec!["".to_string(), "Hello".to_string(), "World".to_string()]
    );
}

#[test]
fn pe32_plus_pipeline() {
    let file = File::parse(&ImageBuilder::new().pe32_plus().build()).unwrap();

    assert_eq!(file.header().machine, machine::AMD64);

    let optional = file.header_optional().unwrap();
    assert_eq!(optional.magic, Bitness::Bits64);
    assert!(optional.is_pe32_plus());
    assert_eq!(optional.image_base, 0x1_4000_0000);
    assert_eq!(optional.base_of_data, None);
    assert_eq!(optional.size_of_stack_reserve, 0x10_0000);
    assert_eq!(optional.directories.len(), 16);

    assert_eq!(file.clr().unwrap().meta_data_rva, ROOT_RVA);
    assert_eq!(
        file.metadata_root().unwrap().version_trimmed(),
        "v4.0.30319"
    );
    assert_eq!(file.user_strings().unwrap().unwrap()[1], "Hello");
}

#[test]
fn free_functions_match_facade() {
    let data = ImageBuilder::new().build();
    let file = File::parse(&data).unwrap();

    let dos = read_dos_header(&data).unwrap();
    assert_eq!(&dos, file.header_dos());

    let coff = read_pe_header(&data, dos.pe_header_offset as usize).unwrap();
    assert_eq!(&coff, file.header());

    let clr = read_clr_header(&data, &coff).unwrap().unwrap();
    assert_eq!(Some(&clr), file.clr());

    let root = read_metadata_root(&data, &coff, &clr).unwrap();
    assert_eq!(Some(&root), file.metadata_root());

    let us = root.stream("#US").unwrap();
    assert_eq!(
        read_user_string_heap(&data, us).unwrap(),
        file.user_strings().unwrap().unwrap()
    );
}

#[test]
fn address_translation() {
    let file = File::from_mem(ImageBuilder::new().build()).unwrap();

    assert_eq!(
        file.rva_to_offset(ROOT_RVA as usize).unwrap(),
        rva_to_file(ROOT_RVA)
    );
    assert!(matches!(
        file.rva_to_offset(0x1000),
        Err(Error::Address(AddressError::RvaNotMapped(0x1000)))
    ));
    assert!(matches!(
        file.offset_to_rva(0x10),
        Err(Error::Address(AddressError::PhysNotMapped(0x10)))
    ));
}

#[test]
fn native_image() {
    let file = File::from_mem(ImageBuilder::new().native().build()).unwrap();

    let optional = file.header_optional().unwrap();
    assert!(!optional
        .directory(DataDirectoryType::ClrRuntimeHeader)
        .unwrap()
        .present);
    assert!(file.clr().is_none());
    assert!(file.metadata_root().is_none());
    assert!(file.user_strings().unwrap().is_none());
}

#[test]
fn user_string_encodings() {
    let data = ImageBuilder::new()
        .user_strings(&["Привет", "A"])
        .build();

    let low = File::from_mem(data.clone()).unwrap();
    let strings = low.user_strings().unwrap().unwrap();
    assert_eq!(strings[1], "\u{1F}\u{40}\u{38}\u{32}\u{35}\u{42}");
    assert_eq!(strings[2], "A");

    let wide = File::from_mem_with(data, DecodeOptions::utf16()).unwrap();
    assert_eq!(wide.options().user_string_encoding, UserStringEncoding::Utf16);
    let strings = wide.user_strings().unwrap().unwrap();
    assert_eq!(strings[1], "Привет");
    assert_eq!(strings[2], "A");
}

#[test]
fn long_user_string() {
    let long = "x".repeat(200);
    let data = ImageBuilder::new().user_strings(&[&long]).build();
    let file = File::from_mem(data).unwrap();

    let root = file.metadata_root().unwrap();
    let us = root.stream("#US").unwrap();
    let strings = UserStrings::decode(file.data(), us, UserStringEncoding::Utf16).unwrap();

    assert_eq!(strings[1], long);
}

#[test]
fn bad_metadata_signature() {
    let mut data = ImageBuilder::new().build();
    data[rva_to_file(ROOT_RVA)] = b'X';

    assert!(matches!(
        File::from_mem(data),
        Err(Error::Format(FormatError::BadMetadataSignature(0x424A_5358)))
    ));
}

#[test]
fn clr_directory_outside_of_sections() {
    let builder = ImageBuilder::new();
    let mut data = builder.build();
    let clr_entry = OPTIONAL_OFFSET + 0x60 + 14 * 8;
    data[clr_entry..clr_entry + 4].copy_from_slice(&0x9000_u32.to_le_bytes());

    assert!(matches!(
        File::from_mem(data),
        Err(Error::Address(AddressError::RvaNotMapped(0x9000)))
    ));
}

#[test]
fn bad_optional_magic() {
    let mut data = ImageBuilder::new().build();
    data[OPTIONAL_OFFSET..OPTIONAL_OFFSET + 2].copy_from_slice(&0x0107_u16.to_le_bytes());

    assert!(matches!(
        File::from_mem(data),
        Err(Error::Format(FormatError::BadOptionalMagic(0x0107)))
    ));
}

#[test]
fn truncated_after_headers() {
    let mut data = ImageBuilder::new().build();
    data.truncate(TEXT_RAW as usize);

    assert!(matches!(File::from_mem(data), Err(Error::OutOfBounds)));
}
