#![no_main]

use libfuzzer_sys::fuzz_target;
use tracelink_qr_scanner::{PayloadNormalizer, display_identifier};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let first = PayloadNormalizer::normalize(raw);
    if let Ok(normalized) = &first {
        assert!(!normalized.canonical_id.is_empty());
        let _ = display_identifier(raw, normalized);
    }

    // 같은 입력은 같은 결과
    assert_eq!(first.ok(), PayloadNormalizer::normalize(raw).ok());
});
