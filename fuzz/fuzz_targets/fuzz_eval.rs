#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(filter) = coursebook::query::parse_filter_json(s) {
        // A few shapes of course documents to exercise the array and nested paths.
        let docs = [
            bson::doc! { "name": "Angular course", "author": "Mosh", "tags": ["angular", "frontend"], "isPublished": true, "price": 15.0 },
            bson::doc! { "name": "Node course", "tags": [], "price": 10, "meta": { "level": 3 } },
            bson::doc! { "isPublished": false },
        ];
        for d in &docs {
            let _ = coursebook::query::eval_filter(d, &filter);
        }
    }
});
