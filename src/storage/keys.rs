/// Derive the destination key from a source key by swapping the final
/// filename extension for `.json`. Only the last dot-segment counts as
/// the extension, so keys with interior dots keep their stem intact
/// (`a.b.ceff` becomes `a.b.json`). A key with no extension gets
/// `.json` appended.
pub fn derive_destination_key(source_key: &str) -> String {
    match source_key.rfind('.') {
        Some(idx) => format!("{}.json", &source_key[..idx]),
        None => format!("{source_key}.json"),
    }
}
