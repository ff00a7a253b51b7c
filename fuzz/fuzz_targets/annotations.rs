#![no_main]

use casebook_core::AnnotationScanner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Case files are read lossily, so every byte string is a valid input
    let contents = String::from_utf8_lossy(data);
    let scanner = AnnotationScanner::default();
    for annotation in scanner.scan("fuzz.game", &contents) {
        assert!(annotation.line >= 1);
        assert!(annotation.text.to_lowercase().contains("error"));
        assert_eq!(annotation.text.trim_end(), annotation.text);
    }
});
