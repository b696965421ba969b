use std::env;
use std::fs;
use std::path::PathBuf;

// Writes `compiled_features.rs` for the `info` command.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let mut features: Vec<String> = env::vars()
        .filter_map(|(k, _)| k.strip_prefix("CARGO_FEATURE_").map(|n| n.to_ascii_lowercase().replace('_', "-")))
        .collect();
    features.sort();
    let items: Vec<String> = features.iter().map(|f| format!("{f:?}")).collect();
    let content = format!("pub static COMPILED_FEATURES: &[&str] = &[{}];\n", items.join(", "));
    fs::write(out.join("compiled_features.rs"), content).expect("write compiled_features.rs");
}
