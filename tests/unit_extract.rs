// Unit tests for the byte-level field extractor.
//
// Payloads are shaped like real Mastodon status JSON, including the nested
// objects that come before and after the fields we look for.

use tagfinder::extract::{
    all_names, name_list_field, string_field, NAME_LABEL, TAGS_LABEL, URI_LABEL,
};

const STATUS: &[u8] = br#"{"id":"111","created_at":"2024-01-01T00:00:00.000Z","in_reply_to_id":null,"sensitive":false,"uri":"https://example.social/users/x/statuses/1","url":"https://example.social/@x/1","account":{"id":"9","username":"x","fields":[{"name":"Site","value":"v"}]},"media_attachments":[],"mentions":[],"tags":[{"name":"Rust","url":"https://example.social/tags/rust"},{"name":"fediverse","url":"https://example.social/tags/fediverse"}],"emojis":[]}"#;

#[test]
fn string_field_returns_value_and_next_offset() {
    let (uri, next) = string_field(STATUS, URI_LABEL, 0).unwrap();
    assert_eq!(uri, b"https://example.social/users/x/statuses/1");
    assert_eq!(STATUS[next - 1], b'"');
    assert!(STATUS[next..].starts_with(b",\"url\""));
}

#[test]
fn string_field_null_and_absent_look_the_same() {
    let null = br#"{"uri":null,"tags":[]}"#;
    let absent = br#"{"id":"1","tags":[]}"#;
    assert_eq!(string_field(null, URI_LABEL, 0), None);
    assert_eq!(string_field(absent, URI_LABEL, 0), None);
}

#[test]
fn string_field_tolerates_whitespace_after_label() {
    let data = br#"{"uri": "https://a.example/1"}"#;
    let (uri, _) = string_field(data, URI_LABEL, 0).unwrap();
    assert_eq!(uri, b"https://a.example/1");

    let null = br#"{"uri": null}"#;
    assert_eq!(string_field(null, URI_LABEL, 0), None);
}

#[test]
fn string_field_rejects_non_string_and_unterminated_values() {
    assert_eq!(string_field(br#"{"uri":42}"#, URI_LABEL, 0), None);
    assert_eq!(string_field(br#"{"uri":"https://a.exa"#, URI_LABEL, 0), None);
    assert_eq!(string_field(br#"{"uri":"#, URI_LABEL, 0), None);
}

#[test]
fn string_field_steps_over_escaped_quotes() {
    let data = br#"{"name":"say \"hi\"","next":"x"}"#;
    let (name, _) = string_field(data, NAME_LABEL, 0).unwrap();
    assert_eq!(name, br#"say \"hi\""#);
}

#[test]
fn string_field_offset_skips_earlier_matches() {
    let data = br#"[{"name":"a"},{"name":"b"}]"#;
    let (first, next) = string_field(data, NAME_LABEL, 0).unwrap();
    assert_eq!(first, b"a");
    let (second, _) = string_field(data, NAME_LABEL, next).unwrap();
    assert_eq!(second, b"b");
    assert_eq!(string_field(data, NAME_LABEL, data.len()), None);
}

#[test]
fn name_list_field_collects_tag_names_in_order() {
    let names = name_list_field(STATUS, TAGS_LABEL);
    assert_eq!(names, vec![&b"Rust"[..], &b"fediverse"[..]]);
}

#[test]
fn name_list_field_empty_list_short_circuits() {
    assert!(name_list_field(br#"{"tags":[],"x":[{"name":"no"}]}"#, TAGS_LABEL).is_empty());
    assert!(name_list_field(br#"{"tags": [ ]}"#, TAGS_LABEL).is_empty());
}

#[test]
fn name_list_field_malformed_input_is_empty() {
    assert!(name_list_field(br#"{"id":"1"}"#, TAGS_LABEL).is_empty());
    assert!(name_list_field(br#"{"tags":null}"#, TAGS_LABEL).is_empty());
    assert!(name_list_field(br#"{"tags":[{"name":"open""#, TAGS_LABEL).is_empty());
    assert!(name_list_field(b"", TAGS_LABEL).is_empty());
}

#[test]
fn name_list_field_skips_entries_without_name() {
    let data = br#"{"tags":[{"url":"u"},{"name":"kept"},{"name":null}]}"#;
    assert_eq!(name_list_field(data, TAGS_LABEL), vec![&b"kept"[..]]);
}

#[test]
fn all_names_scans_followed_tags_array() {
    let body = br#"[{"name":"News","url":"u","history":[],"following":true},{"name":"tech","url":"u","history":[],"following":true}]"#;
    assert_eq!(all_names(body), vec![&b"News"[..], &b"tech"[..]]);
    assert!(all_names(b"[]").is_empty());
}
