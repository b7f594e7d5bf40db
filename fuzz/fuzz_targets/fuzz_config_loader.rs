#![no_main]

use degenscore::config::ConfigLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // Only panics matter; errors are expected.
        let loader = ConfigLoader::with_defaults();
        let _ = loader.load_from_str(yaml_str);
    }
});
