#![no_main]
use iscc_codec::{normalize, validate, Code};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = validate(data, false);
    if let Ok(code) = data.parse::<Code>() {
        assert_eq!(code.uri().parse::<Code>().unwrap(), code);
    }
    if let Ok(normalized) = normalize(data) {
        assert_eq!(normalize(&normalized).unwrap(), normalized);
    }
});
