/// Channel-role markers that may prefix a member name (`*` owner, `+` moderator).
pub const ROLE_SIGILS: [char; 2] = ['*', '+'];

/// Parse a channel member-list payload into sorted canonical names.
///
/// Known payload dialects:
///   `Members of KnightGuard(3): Alice, *Bob, +Carol`
///   `[6. KnightGuard] Alice, *Bob, +Carol`
///   `Alice, Bob, Carol`
///
/// The name list starts after the first `": "`, else after the first `"] "`,
/// else the whole payload is taken as the list. Never fails: a payload with
/// no recognizable delimiter degrades to a best-effort list of names.
pub fn parse_member_list(raw: &str) -> Vec<String> {
    let list = extract_name_list(raw);

    let mut names: Vec<String> = list
        .split(',')
        .filter_map(canonical_name)
        .map(str::to_string)
        .collect();

    names.sort();
    names.dedup();
    names
}

/// Trim whitespace and strip leading role sigils, along with any whitespace
/// the sigils left in front of the name. Returns `None` when nothing is left.
pub fn canonical_name(token: &str) -> Option<&str> {
    let name = token.trim().trim_start_matches(ROLE_SIGILS).trim_start();
    if name.is_empty() { None } else { Some(name) }
}

fn extract_name_list(raw: &str) -> &str {
    if let Some(idx) = raw.find(": ") {
        return &raw[idx + 2..];
    }
    if let Some(idx) = raw.find("] ") {
        return &raw[idx + 2..];
    }
    raw
}
