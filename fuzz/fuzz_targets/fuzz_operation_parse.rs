#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Operations arrive as tagged JSON from scripts and hosts.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<attest_node::Operation>(text);
        let _ = serde_json::from_str::<attest_types::VerificationParams>(text);
        let _ = text.parse::<attest_types::ContentId>();
    }

    // Snapshots are read back from disk with bincode.
    let _ = bincode::deserialize::<attest_verification::EngineSnapshot>(data);
});
