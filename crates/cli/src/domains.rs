//! Known lockdownd domains

/// Domains lockdownd is known to answer queries for
pub const KNOWN_DOMAINS: &[&str] = &[
    "com.apple.disk_usage",
    "com.apple.disk_usage.factory",
    "com.apple.mobile.battery",
    // com.apple.mobile.debug is left out: lockdownd crashes on it intermittently
    "com.apple.iqagent",
    "com.apple.purplebuddy",
    "com.apple.PurpleBuddy",
    "com.apple.mobile.chaperone",
    "com.apple.mobile.third_party_termination",
    "com.apple.mobile.lockdownd",
    "com.apple.mobile.lockdown_cache",
    "com.apple.xcode.developerdomain",
    "com.apple.international",
    "com.apple.mobile.data_sync",
    "com.apple.mobile.tethered_sync",
    "com.apple.mobile.mobile_application_usage",
    "com.apple.mobile.backup",
    "com.apple.mobile.nikita",
    "com.apple.mobile.restriction",
    "com.apple.mobile.user_preferences",
    "com.apple.mobile.sync_data_class",
    "com.apple.mobile.software_behavior",
    "com.apple.mobile.iTunes.SQLMusicLibraryPostProcessCommands",
    "com.apple.mobile.iTunes.accessories",
    "com.apple.mobile.internal",          // iOS 4.0+
    "com.apple.mobile.wireless_lockdown", // iOS 4.0+
    "com.apple.fairplay",
    "com.apple.iTunes",
    "com.apple.mobile.iTunes.store",
    "com.apple.mobile.iTunes",
];

/// The built-in domain table plus any configured extras
#[derive(Debug, Clone, Default)]
pub struct DomainTable {
    extra: Vec<String>,
}

impl DomainTable {
    pub fn new(extra: Vec<String>) -> Self {
        Self { extra }
    }

    /// True if any known domain occurs within `domain`
    ///
    /// This is a substring test, so "com.apple.mobile.battery.foo" counts as
    /// known.
    pub fn is_known(&self, domain: &str) -> bool {
        self.iter().any(|known| domain.contains(known))
    }

    /// Built-in domains first, then extras
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        KNOWN_DOMAINS
            .iter()
            .copied()
            .chain(self.extra.iter().map(String::as_str))
    }
}

/// Help text listing the known domains, one per line
pub fn known_domains_help() -> String {
    let mut help = String::from("Known domains are:\n\n");
    for domain in KNOWN_DOMAINS {
        help.push_str("  ");
        help.push_str(domain);
        help.push('\n');
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        assert_eq!(KNOWN_DOMAINS.len(), 29);
        assert!(!KNOWN_DOMAINS.contains(&"com.apple.mobile.debug"));
    }

    #[test]
    fn test_exact_domain_is_known() {
        let table = DomainTable::default();
        assert!(table.is_known("com.apple.mobile.battery"));
        assert!(table.is_known("com.apple.PurpleBuddy"));
    }

    #[test]
    fn test_substring_semantics() {
        let table = DomainTable::default();
        // A known entry embedded in a longer name still matches
        assert!(table.is_known("com.apple.mobile.battery.extended"));
        assert!(table.is_known("com.apple.iTunes.whatever"));
        // Case matters
        assert!(!table.is_known("COM.APPLE.MOBILE.BATTERY"));
    }

    #[test]
    fn test_unknown_domain() {
        let table = DomainTable::default();
        assert!(!table.is_known("com.example.custom"));
        assert!(!table.is_known(""));
    }

    #[test]
    fn test_extra_domains() {
        let table = DomainTable::new(vec!["com.example.custom".to_string()]);
        assert!(table.is_known("com.example.custom"));
        assert_eq!(table.iter().count(), KNOWN_DOMAINS.len() + 1);
        assert_eq!(table.iter().last(), Some("com.example.custom"));
    }

    #[test]
    fn test_help_lists_domains() {
        let help = known_domains_help();
        assert!(help.starts_with("Known domains are:"));
        assert!(help.contains("  com.apple.mobile.wireless_lockdown\n"));
    }
}
