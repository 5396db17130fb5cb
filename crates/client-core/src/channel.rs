//! Call channel naming

use rand::Rng;

/// Keep alphanumerics, `-` and `_`, then trim
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Channel name for a call to `identifier` with a random suffix in
/// `0..suffix_range`
pub fn channel_name_for(identifier: &str, suffix_range: u32) -> String {
    let suffix = rand::thread_rng().gen_range(0..suffix_range.max(1));
    format!("{}{}", sanitize_identifier(identifier), suffix)
}
