#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(expr) = dc_models::CompiledExpr::compile(text) {
        let _ = expr.eval_with(|_| Some(1.5));
    }
});
