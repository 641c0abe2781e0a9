use guard_protocol::WhitelistEntry;
use guard_protocol::WhitelistKind;

/// A review matches the whitelist iff its project name equals a `project`
/// entry, or its family label equals a `family` entry. See spec §3.
pub fn is_whitelisted(project_name: &str, family_label: Option<&str>, whitelist: &[WhitelistEntry]) -> bool {
    whitelist.iter().any(|entry| match entry.kind {
        WhitelistKind::Project => entry.value == project_name,
        WhitelistKind::Family => Some(entry.value.as_str()) == family_label,
    })
}
