/// Split raw object content strictly on `'\n'`, preserving empty
/// segments. Callers filter empties; no other whitespace is trimmed.
/// Total: every input has a defined output, and an empty input yields
/// a single empty segment.
pub fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('\n')
}
