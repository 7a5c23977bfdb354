//! Host name helpers

/// Canonical form of a cluster node name. Node names are case-insensitive.
pub fn normalize_host(host: &str) -> String {
    host.to_uppercase()
}

/// Compare two node names the way the cluster does.
pub fn hosts_equal(a: &str, b: &str) -> bool {
    normalize_host(a) == normalize_host(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_equal_ignores_case() {
        assert!(hosts_equal("hv-node-01", "HV-NODE-01"));
        assert!(hosts_equal("Hv-Node-01", "hV-nODE-01"));
        assert!(!hosts_equal("hv-node-01", "hv-node-02"));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("node1.contoso.local"), "NODE1.CONTOSO.LOCAL");
    }
}
