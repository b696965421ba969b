#![no_main]
use coursebook::document::Document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(update) = coursebook::query::parse_update_json(s) {
        let mut doc = Document::new(bson::doc! {
            "name": "Node.js course",
            "tags": ["node", "backend"],
            "price": 15,
            "nested": { "z": 3 },
        });
        let _ = coursebook::query::apply_update(&mut doc, &update);
    }
});
