#![no_main]

use casebook_core::compare::compare_board;
use casebook_core::panes::{Palette, render};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (expected, found) = data;
    // A board always matches itself
    assert_eq!(compare_board(expected, expected), None);
    let _ = compare_board(expected, found);
    let _ = render(expected, found, &Palette::ANSI);
});
