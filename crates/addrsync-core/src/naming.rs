// # Object Name Generation
//
// Derives stable device object names for desired addresses.
//
// - Content-addressed: `<namespace>-<zbase32(crc64(address))>`. The CRC-64
//   parameters and the z-base-32 alphabet are fixed so that names stay
//   compatible with objects already created on devices.
// - Identity-addressed: `<namespace>-<sanitized id>-v4|v6`, for sources
//   that supply a stable external identifier.
//
// Every function here is pure: same input, same name, across runs and
// process restarts. That is what keeps reconciliation free of name churn.

use crate::address::{AddressFamily, NormalizedAddress};
use crate::aggregate::{DesiredEntry, DesiredSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Maximum length of an address-book object name on the device
pub const MAX_OBJECT_NAME_LEN: usize = 63;

/// Length of an encoded content digest (64 bits in 5-bit groups)
pub const CONTENT_DIGEST_LEN: usize = 13;

/// Reflected CRC-64 polynomial
const CRC64_POLY: u64 = 0x3405_254d_7ba5_59cd;

const CRC64_TABLE: [u64; 256] = crc64_table(CRC64_POLY);

const ZBASE32_ALPHABET: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

/// How object names are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Hash of the normalized address
    #[default]
    ContentAddressed,
    /// Source-supplied stable identifier
    IdentityAddressed,
}

impl FromStr for NamingStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" | "content_addressed" | "hash" => Ok(NamingStrategy::ContentAddressed),
            "identity" | "identity_addressed" | "id" => Ok(NamingStrategy::IdentityAddressed),
            other => Err(crate::Error::config(format!(
                "Unknown naming strategy '{}'. Valid: content, identity",
                other
            ))),
        }
    }
}

const fn crc64_table(poly: u64) -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ poly } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-64 checksum (reflected, init and final xor all-ones)
pub fn crc64(bytes: &[u8]) -> u64 {
    let mut crc = !0u64;
    for &b in bytes {
        crc = CRC64_TABLE[((crc as u8) ^ b) as usize] ^ (crc >> 8);
    }
    !crc
}

/// z-base-32 encoding, most significant bit first, no padding
pub fn zbase32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &b in bytes {
        buffer = (buffer << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ZBASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }

    if bits > 0 {
        out.push(ZBASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// Content-addressed name for an address
pub fn content_name(namespace: &str, address: &NormalizedAddress) -> String {
    let digest = crc64(address.as_str().as_bytes()).to_le_bytes();
    format!("{}-{}", namespace, zbase32_encode(&digest))
}

/// Reduce an external identifier to characters legal in object names
///
/// ASCII alphanumerics, `-`, `_` and `.` are kept; every other run of
/// characters becomes a single `-`. Leading and trailing `-` are dropped.
pub fn sanitize_identifier(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut pending_dash = false;

    for c in id.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Identity-addressed name, or `None` when the identifier sanitizes to
/// nothing
pub fn identity_name(namespace: &str, id: &str, family: AddressFamily) -> Option<String> {
    let mut sanitized = sanitize_identifier(id);
    if sanitized.is_empty() {
        return None;
    }

    let suffix = family.name_suffix();
    // "<namespace>-" + id + "-" + suffix
    let budget = MAX_OBJECT_NAME_LEN.saturating_sub(namespace.len() + suffix.len() + 2);
    if budget == 0 {
        return None;
    }
    if sanitized.len() > budget {
        sanitized.truncate(budget);
        while sanitized.ends_with('-') {
            sanitized.pop();
        }
    }

    Some(format!("{}-{}-{}", namespace, sanitized, suffix))
}

/// Name generator bound to a namespace and strategy
#[derive(Debug, Clone, Copy)]
pub struct NameGenerator<'a> {
    namespace: &'a str,
    strategy: NamingStrategy,
}

impl<'a> NameGenerator<'a> {
    /// Create a generator
    pub fn new(namespace: &'a str, strategy: NamingStrategy) -> Self {
        Self {
            namespace,
            strategy,
        }
    }

    /// Content-addressed name, regardless of strategy
    pub fn content_name(&self, address: &NormalizedAddress) -> String {
        content_name(self.namespace, address)
    }

    /// Name for a single address
    ///
    /// Identity addressing falls back to content addressing for entries
    /// without a usable identifier.
    pub fn name_for(&self, address: &NormalizedAddress, entry: &DesiredEntry) -> String {
        match self.strategy {
            NamingStrategy::ContentAddressed => self.content_name(address),
            NamingStrategy::IdentityAddressed => entry
                .external_id
                .as_deref()
                .and_then(|id| identity_name(self.namespace, id, entry.family))
                .unwrap_or_else(|| self.content_name(address)),
        }
    }

    /// Names for a whole desired set
    ///
    /// If several addresses map to the same identity name, all of them get
    /// content-addressed names instead, so names stay unique.
    pub fn assign(&self, desired: &DesiredSet) -> BTreeMap<NormalizedAddress, String> {
        let mut names: BTreeMap<NormalizedAddress, String> = desired
            .iter()
            .map(|(address, entry)| (address.clone(), self.name_for(address, entry)))
            .collect();

        if self.strategy == NamingStrategy::IdentityAddressed {
            let mut uses: HashMap<&str, usize> = HashMap::new();
            for name in names.values() {
                *uses.entry(name.as_str()).or_default() += 1;
            }

            let colliding: Vec<NormalizedAddress> = names
                .iter()
                .filter(|(_, name)| uses.get(name.as_str()).copied().unwrap_or(0) > 1)
                .map(|(address, _)| address.clone())
                .collect();

            for address in colliding {
                let name = self.content_name(&address);
                names.insert(address, name);
            }
        }

        names
    }
}
