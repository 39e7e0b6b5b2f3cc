const MIN_SUBSTRING_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameMatch {
    None,
    Substring,
    Exact,
}

/// Canonical form used to compare display names across sources.
pub fn normalize(input: &str) -> String {
    let trimmed = strip_clan_tag(input.trim());
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Compares two names after normalization. A substring hit tolerates
/// truncated usernames and always ranks below an exact hit.
pub fn compare_names(a: &str, b: &str) -> NameMatch {
    compare_normalized(&normalize(a), &normalize(b))
}

pub fn compare_normalized(a: &str, b: &str) -> NameMatch {
    if a.is_empty() || b.is_empty() {
        return NameMatch::None;
    }
    if a == b {
        return NameMatch::Exact;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.chars().count() >= MIN_SUBSTRING_LEN && long.contains(short) {
        return NameMatch::Substring;
    }
    NameMatch::None
}

fn strip_clan_tag(raw: &str) -> &str {
    let close = match raw.chars().next() {
        Some('[') => ']',
        Some('(') => ')',
        _ => return raw,
    };
    let Some(end) = raw.find(close) else {
        return raw;
    };
    let rest = raw[end + close.len_utf8()..].trim_start();
    if rest.chars().any(|c| c.is_alphanumeric()) {
        rest
    } else {
        raw
    }
}
