//! Plain-text helpers for parsing chat commands.

/// Split `text` on `splitter` into exactly `size` parts.
///
/// The first `size - 1` separators split; everything after them stays in the
/// last part. Missing parts (fewer separators than `size - 1`, or no text at
/// all) are `None`. An empty splitter never splits.
pub fn split(text: Option<&str>, splitter: &str, size: usize) -> Vec<Option<String>> {
    let mut parts: Vec<Option<String>> = Vec::with_capacity(size);

    if let Some(mut rest) = text {
        for i in 0..size {
            let found = if splitter.is_empty() || i == size - 1 {
                None
            } else {
                rest.find(splitter)
            };
            match found {
                Some(pos) => {
                    parts.push(Some(rest[..pos].to_string()));
                    rest = &rest[pos + splitter.len()..];
                }
                None => {
                    parts.push(Some(rest.to_string()));
                    break;
                }
            }
        }
    }

    parts.resize(size, None);
    parts
}
