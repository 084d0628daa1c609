// Field extraction from raw streamed JSON payloads.
//
// Streaming payloads arrive as complete JSON objects from a trusted API at
// high message rates. Only two fields matter (`uri` and `tags[].name`), so
// instead of parsing the whole document we scan the raw bytes for the field
// labels directly. This is a performance trade-off and deliberately narrow:
// anything unexpected degrades to "field not found", never to an error.
//
// Returned values are the raw bytes between the quotes. JSON escapes are not
// decoded.

/// Label of the status URI field.
pub const URI_LABEL: &[u8] = b"\"uri\":";
/// Label of the status tag list field.
pub const TAGS_LABEL: &[u8] = b"\"tags\":";
/// Label of the name field inside tag objects.
pub const NAME_LABEL: &[u8] = b"\"name\":";

/// Find `needle` in `haystack` starting at `from`, returning the absolute index.
pub fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

/// True if `needle` occurs anywhere in `haystack`.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle, 0).is_some()
}

fn skip_whitespace(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() && data[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Position of the closing quote of a string whose body starts at `start`.
/// Backslash-escaped quotes are stepped over.
fn closing_quote(data: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < data.len() {
        match data[pos] {
            b'\\' => pos += 2,
            b'"' => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

/// Extract the string value following the first `label` at or after `offset`.
///
/// Returns the value and the offset just past its closing quote, so callers
/// can keep scanning for the next occurrence. A JSON `null` value, a missing
/// label and a non-string value all return `None`.
pub fn string_field<'a>(data: &'a [u8], label: &[u8], offset: usize) -> Option<(&'a [u8], usize)> {
    let label_start = find(data, label, offset)?;
    let value_start = skip_whitespace(data, label_start + label.len());
    let rest = data.get(value_start..)?;

    if rest.starts_with(b"null") || rest.first() != Some(&b'"') {
        return None;
    }

    let body_start = value_start + 1;
    let body_end = closing_quote(data, body_start)?;
    Some((&data[body_start..body_end], body_end + 1))
}

/// Extract every `"name"` string from the list of objects following `label`.
///
/// Used for `"tags":[{"name":"rust",...},...]`. Names are returned in the
/// order they appear. An explicit empty list, a missing label or a list that
/// is not terminated all yield an empty result.
pub fn name_list_field<'a>(data: &'a [u8], label: &[u8]) -> Vec<&'a [u8]> {
    let mut names = Vec::new();

    let Some(label_start) = find(data, label, 0) else {
        return names;
    };
    let list_start = skip_whitespace(data, label_start + label.len());
    if data.get(list_start) != Some(&b'[') {
        return names;
    }
    if data.get(skip_whitespace(data, list_start + 1)) == Some(&b']') {
        return names;
    }
    let Some(list_end) = find(data, b"]", list_start + 1) else {
        return names;
    };

    let list = &data[..list_end];
    let mut pos = list_start + 1;
    while let Some(entry_start) = find(list, b"{", pos) {
        let Some(entry_end) = find(list, b"}", entry_start + 1) else {
            break;
        };
        if let Some((name, _)) = string_field(&list[entry_start..entry_end], NAME_LABEL, 0) {
            names.push(name);
        }
        pos = entry_end + 1;
    }

    names
}

/// Collect every `"name"` string in `data`, scanning forward from the start.
///
/// Used on the followed-tags response, which is a flat array of tag objects.
pub fn all_names(data: &[u8]) -> Vec<&[u8]> {
    let mut names = Vec::new();
    let mut offset = 0;
    while let Some((name, next)) = string_field(data, NAME_LABEL, offset) {
        names.push(name);
        offset = next;
    }
    names
}
