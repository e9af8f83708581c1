/// System instruction describing the exact JSON schema the model must emit.
///
/// The normalizer tolerates deviations from this shape, but the closer the
/// model sticks to it the less coercion happens downstream.
pub const SYSTEM_INSTRUCTION: &str = "\
- entities: Names, Dates, Addresses
- tables: headers and rows

Respond in this JSON format:
{
  \"entities\": {
    \"names\": [],
    \"dates\": [],
    \"addresses\": []
  },
  \"tables\": [ { \"headers\": [], \"rows\": [] } ]
}";

/// Truncate `text` to at most `max_chars` characters, respecting UTF-8
/// boundaries. Silent by contract; very long documents simply lose their
/// tail before transmission.
pub fn truncate_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
