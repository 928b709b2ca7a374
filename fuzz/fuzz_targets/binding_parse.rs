#![no_main]

use dynavar::Binding;
use libfuzzer_sys::fuzz_target;

const MAX_BINDING_BYTES: usize = 1024;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_BINDING_BYTES)];
    let Ok(raw) = std::str::from_utf8(capped) else {
        return;
    };

    let Ok(binding) = Binding::parse(raw) else {
        return;
    };

    // Normalization is canonical: reparsing the normalized text must accept
    // it and produce the same function, arguments and normalized form.
    let normalized = binding.normalized();
    let reparsed = Binding::parse(&normalized).expect("normalized binding must reparse");
    assert_eq!(reparsed.function(), binding.function());
    assert_eq!(reparsed.arguments(), binding.arguments());
    assert_eq!(reparsed.normalized(), normalized);
});
