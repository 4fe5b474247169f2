#![no_main]
use iscc_codec::{decompose_bytes, Header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Header::decode(data);
    if let Ok(units) = decompose_bytes(data) {
        for unit in units {
            let again = decompose_bytes(unit.as_bytes()).unwrap();
            assert_eq!(again, vec![unit]);
        }
    }
});
