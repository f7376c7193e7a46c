//! Allow-list of Salsa deployment hosts.

/// Hostnames of the Salsa Classic deployments we are willing to send credentials to.
pub const VALID_HOSTS: &[&str] = &[
    "org.salsalabs.com",
    "org2.salsalabs.com",
    "salsa3.salsalabs.com",
    "salsa4.salsalabs.com",
    "wfc.salsalabs.com",
    "wfc2.salsalabs.com",
];

/// Strip an `http://` or `https://` prefix.
pub fn strip_scheme(host: &str) -> &str {
    host.strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host)
}

/// True if `host` (with or without scheme) is exactly one of [`VALID_HOSTS`].
///
/// Matching is case-sensitive and does not tolerate a trailing slash or path.
pub fn is_valid_host(host: &str) -> bool {
    VALID_HOSTS.contains(&strip_scheme(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_hosts_with_and_without_scheme() {
        assert!(is_valid_host("https://salsa4.salsalabs.com"));
        assert!(is_valid_host("http://org2.salsalabs.com"));
        assert!(is_valid_host("wfc.salsalabs.com"));
    }

    #[test]
    fn rejects_unknown_and_near_miss_hosts() {
        assert!(!is_valid_host("evil.example.com"));
        assert!(!is_valid_host("https://SALSA4.salsalabs.com"));
        assert!(!is_valid_host("https://salsa4.salsalabs.com/"));
        assert!(!is_valid_host(""));
    }

    #[test]
    fn strip_scheme_only_removes_prefix() {
        assert_eq!(strip_scheme("https://a.b"), "a.b");
        assert_eq!(strip_scheme("http://a.b"), "a.b");
        assert_eq!(strip_scheme("ftp://a.b"), "ftp://a.b");
    }
}
