//! Fuzz target for user-supplied install inputs.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use chrono::{Local, TimeZone};
use iosctl::network::{backup_destination, ConfigUrl};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInstall {
    url: String,
    filesystem: String,
    hostname: String,
    backup_name: Option<String>,
    timestamp: u32,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(input) = FuzzInstall::arbitrary(&mut unstructured) else {
        return;
    };

    if let Ok(url) = ConfigUrl::parse(&input.url) {
        assert!(!url.as_str().is_empty());
        assert!(!url.as_str().chars().any(char::is_whitespace));
    }

    let Some(when) = Local.timestamp_opt(i64::from(input.timestamp), 0).single() else {
        return;
    };
    let destination = backup_destination(
        &input.filesystem,
        &input.hostname,
        input.backup_name.as_deref(),
        when,
    );
    assert!(destination.contains(':'));
});
