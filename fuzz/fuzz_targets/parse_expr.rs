#![no_main]

use libfuzzer_sys::fuzz_target;
use md5chk::DigestExpr;

fuzz_target!(|text: &str| {
    // Anything that parses must survive printing and parsing again
    if let Ok(expr) = text.parse::<DigestExpr>() {
        let printed = expr.to_string();
        assert_eq!(printed.parse::<DigestExpr>(), Ok(expr));
        assert!(printed.eq_ignore_ascii_case(text));
    }
});
