//! Fuzz target for device response scanning.
//!
//! Prompt parsing and classification run on raw device text, so they must
//! never panic whatever the device sends.

#![no_main]

use libfuzzer_sys::fuzz_target;
use iosctl::network::{awaiting_confirmation, parse_prompt, Response, ResponseClassifier};

fuzz_target!(|data: &[u8]| {
    let output = String::from_utf8_lossy(data);
    let classifier = ResponseClassifier::default();

    if let Some(prompt) = parse_prompt(&output) {
        assert!(!prompt.hostname.is_empty());
        // A prompt line is never also a question
        assert!(!awaiting_confirmation(&output));
    }

    let copy = classifier.classify_copy(&output);
    let configure = classifier.classify_configure(&output);
    let _ = classifier.classify_enable(&output);

    // Anything that fails configure also fails copy
    if let Response::DeviceError(_) = configure {
        assert!(matches!(copy, Response::DeviceError(_)));
        assert!(classifier.has_error(&output) || awaiting_confirmation(&output));
    }
});
