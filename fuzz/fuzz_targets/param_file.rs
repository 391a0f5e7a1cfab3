#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Keep inputs small; the parser is line-based and linear.
    if data.len() > 1 << 14 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(params) = dc_models::ParameterSet::parse(text) {
        for (name, _) in params.iter() {
            assert!(params.get(name).is_some());
        }
    }
});
