// # Address Normalization
//
// Canonicalizes raw address strings into a CIDR-suffixed form so that
// device state and desired state can be compared as plain strings.
//
// No syntactic validation happens here. Malformed input is suffixed like
// anything else and rejected later by the device that applies the commands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address family of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressFamily {
    /// IPv4
    #[serde(rename = "ipv4", alias = "v4")]
    V4,
    /// IPv6
    #[serde(rename = "ipv6", alias = "v6")]
    V6,
}

impl AddressFamily {
    /// Infer the family from a raw or normalized address string
    pub fn detect(address: &str) -> Self {
        if address.contains(':') {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }

    /// Host prefix length for this family
    pub fn host_prefix(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// Short suffix used in identity-addressed object names
    pub fn name_suffix(self) -> &'static str {
        match self {
            AddressFamily::V4 => "v4",
            AddressFamily::V6 => "v6",
        }
    }
}

/// A host or network address carrying exactly one prefix-length suffix
///
/// Ordering is lexicographic over the string form, which is the order the
/// differ relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedAddress(String);

impl NormalizedAddress {
    /// Borrow the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address family, inferred from the string form
    pub fn family(&self) -> AddressFamily {
        AddressFamily::detect(&self.0)
    }

    /// Consume into the string form
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a raw address string
///
/// 1. Input already containing `/` is returned unchanged.
/// 2. Input containing `:` gets `/128`.
/// 3. Anything else gets `/32`.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> NormalizedAddress {
    if raw.contains('/') {
        return NormalizedAddress(raw.to_string());
    }

    let family = AddressFamily::detect(raw);
    NormalizedAddress(format!("{}/{}", raw, family.host_prefix()))
}

/// Normalize, sort ascending and deduplicate a list of raw addresses
pub fn normalize_sorted<S: AsRef<str>>(raw: &[S]) -> Vec<NormalizedAddress> {
    let mut out: Vec<NormalizedAddress> = raw.iter().map(|r| normalize(r.as_ref())).collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_addresses_get_family_suffix() {
        assert_eq!(normalize("1.2.3.4").as_str(), "1.2.3.4/32");
        assert_eq!(normalize("::1").as_str(), "::1/128");
        assert_eq!(normalize("2001:db8::7").as_str(), "2001:db8::7/128");
    }

    #[test]
    fn cidr_input_is_untouched() {
        assert_eq!(normalize("10.0.0.0/24").as_str(), "10.0.0.0/24");
        assert_eq!(normalize("2001:db8::/32").as_str(), "2001:db8::/32");
    }

    #[test]
    fn invalid_input_is_only_suffixed() {
        assert_eq!(normalize("not-an-ip").as_str(), "not-an-ip/32");
        assert_eq!(normalize("").as_str(), "/32");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["1.2.3.4", "::1", "10.0.0.0/24", "aa", "a:b", "", "x/y/z"] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "normalize not idempotent for {raw:?}");
        }
    }

    #[test]
    fn family_detection() {
        assert_eq!(normalize("1.2.3.4").family(), AddressFamily::V4);
        assert_eq!(normalize("fe80::1").family(), AddressFamily::V6);
        assert_eq!(AddressFamily::V6.name_suffix(), "v6");
    }

    #[test]
    fn normalize_sorted_dedups_after_normalizing() {
        let out = normalize_sorted(&["b", "a/32", "a", "c/32"]);
        let strs: Vec<&str> = out.iter().map(|a| a.as_str()).collect();
        assert_eq!(strs, vec!["a/32", "b/32", "c/32"]);
    }

    #[test]
    fn family_serde_names() {
        let fam: AddressFamily = serde_json::from_str("\"ipv6\"").unwrap();
        assert_eq!(fam, AddressFamily::V6);
        let fam: AddressFamily = serde_json::from_str("\"v4\"").unwrap();
        assert_eq!(fam, AddressFamily::V4);
    }
}
