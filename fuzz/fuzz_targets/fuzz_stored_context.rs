#![no_main]

use degenscore::flow::{CONTEXT_KEY, FlowContext, KeyValueStore, MemoryStore};
use degenscore::scorecard::Scorecard;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let store = MemoryStore::new();
    if store.set(CONTEXT_KEY, raw).is_err() {
        return;
    }
    // Whatever decodes must produce a bounded scorecard.
    if let Ok(ctx) = FlowContext::load(&store) {
        let card = Scorecard::from_scores(ctx.scores());
        assert!(card.total <= 1000);
        assert!((1..=99).contains(&card.percentile));
    }
});
