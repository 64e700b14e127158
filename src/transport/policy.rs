/// How an allowlist entry is compared against an inbound identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowlistMatch {
    Exact,
    CaseInsensitive,
}

/// `"*"` admits everyone; an empty list admits no one.
#[must_use]
pub fn is_allowed_user(allowlist: &[String], identity: &str, mode: AllowlistMatch) -> bool {
    if identity.is_empty() {
        return allowlist.iter().any(|entry| entry == "*");
    }
    let identity = identity.trim_start_matches('@');
    allowlist.iter().any(|entry| {
        let entry = entry.trim_start_matches('@');
        entry == "*"
            || match mode {
                AllowlistMatch::Exact => entry == identity,
                AllowlistMatch::CaseInsensitive => entry.eq_ignore_ascii_case(identity),
            }
    })
}
