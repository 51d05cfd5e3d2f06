//! Vote detection over raw feed messages.

/// Returns every option whose text occurs somewhere in `message`.
///
/// Matching is case-insensitive over the whole message, so an option hiding
/// inside a longer word still counts. Each option is reported at most once
/// per message, with its stored casing preserved for downstream keys.
pub fn find_votes<'a>(options: &'a [String], message: &str) -> Vec<&'a str> {
    let lowered = message.to_lowercase();
    options
        .iter()
        .filter(|option| lowered.contains(&option.to_lowercase()))
        .map(String::as_str)
        .collect()
}
