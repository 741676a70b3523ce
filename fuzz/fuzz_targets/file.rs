#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::File;

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = File::parse(data) {
        let _ = file.user_strings();
    }
});
