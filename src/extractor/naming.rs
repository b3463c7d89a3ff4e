use crate::config::CollisionPolicy;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hex digits of the DN hash appended to a colliding stem.
const COLLISION_SUFFIX_LEN: usize = 8;

/// Turns a distinguished name into a file name stem.
///
/// `=`, `,` and spaces become `_`. Path separators and control characters
/// are replaced too so the stem can never leave the output directory.
pub fn sanitize_dn(dn: &str) -> String {
    dn.chars()
        .map(|ch| match ch {
            '=' | ',' | ' ' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `{stem}_{index}.der`, with a 1-based index.
pub fn certificate_file_name(stem: &str, index: usize) -> String {
    format!("{}_{}.der", stem, index)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnStem {
    pub stem: String,
    /// The earlier DN that already claimed the sanitized form, if any.
    pub collided_with: Option<String>,
}

/// Hands out file name stems for the DNs of one run.
///
/// Every stem handed out is remembered together with the DN that owns it,
/// so a disambiguated stem is never reused by a later DN either.
pub struct FileNamer {
    policy: CollisionPolicy,
    owners: HashMap<String, String>,
    stems: HashMap<String, String>,
}

impl FileNamer {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            owners: HashMap::new(),
            stems: HashMap::new(),
        }
    }

    pub fn stem_for(&mut self, dn: &str) -> DnStem {
        if let Some(stem) = self.stems.get(dn) {
            return DnStem {
                stem: stem.clone(),
                collided_with: None,
            };
        }

        let sanitized = sanitize_dn(dn);
        let earlier = match self.owners.get(&sanitized).cloned() {
            Some(earlier) => earlier,
            None => {
                self.claim(dn, &sanitized);
                return DnStem {
                    stem: sanitized,
                    collided_with: None,
                };
            }
        };

        let stem = match self.policy {
            CollisionPolicy::Overwrite => sanitized,
            CollisionPolicy::Disambiguate => {
                let stem = self.free_stem(&sanitized, dn);
                self.owners.insert(stem.clone(), dn.to_string());
                stem
            }
        };
        self.stems.insert(dn.to_string(), stem.clone());

        tracing::debug!(dn, earlier = %earlier, stem = %stem, "sanitized DN collision");

        DnStem {
            stem,
            collided_with: Some(earlier),
        }
    }

    fn claim(&mut self, dn: &str, stem: &str) {
        self.owners.insert(stem.to_string(), dn.to_string());
        self.stems.insert(dn.to_string(), stem.to_string());
    }

    /// `{sanitized}_{hash prefix}`, lengthening the prefix until the stem is
    /// unclaimed. A numeric suffix is the last resort once the hash runs out.
    fn free_stem(&self, sanitized: &str, dn: &str) -> String {
        let digest = dn_hash(dn);

        for len in COLLISION_SUFFIX_LEN..=digest.len() {
            let candidate = format!("{}_{}", sanitized, &digest[..len]);
            if !self.owners.contains_key(&candidate) {
                return candidate;
            }
        }

        (2usize..)
            .map(|n| format!("{}_{}_{}", sanitized, digest, n))
            .find(|candidate| !self.owners.contains_key(candidate))
            .unwrap_or_else(|| format!("{}_{}", sanitized, digest))
    }
}

fn dn_hash(dn: &str) -> String {
    hex::encode(Sha256::digest(dn.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_dn() {
        assert_eq!(sanitize_dn("cn=test,o=example"), "cn_test_o_example");
        assert_eq!(
            sanitize_dn("CN=Jane Doe, OU=Sales,C=SE"),
            "CN_Jane_Doe__OU_Sales_C_SE"
        );
        assert_eq!(sanitize_dn("cn=a/b,o=c\\d"), "cn_a_b_o_c_d");
        assert_eq!(sanitize_dn("plain"), "plain");
    }

    #[test]
    fn test_sanitized_dn_has_no_separator_characters() {
        let dns = [
            "cn=test,o=example",
            "uid=john smith,ou=People,dc=example,dc=com",
            "  = , = ,  ",
            "serialNumber=1234=5678,c=se",
        ];

        for dn in &dns {
            let sanitized = sanitize_dn(dn);
            assert!(
                !sanitized.contains(&['=', ',', ' '][..]),
                "unsanitized character left in {}",
                sanitized
            );
            assert_eq!(sanitized.chars().count(), dn.chars().count());
        }
    }

    #[test]
    fn test_certificate_file_name() {
        assert_eq!(
            certificate_file_name("cn_test_o_example", 1),
            "cn_test_o_example_1.der"
        );
        assert_eq!(certificate_file_name("x", 12), "x_12.der");
    }

    #[test]
    fn test_same_dn_keeps_its_stem() {
        let mut namer = FileNamer::new(CollisionPolicy::Disambiguate);
        let first = namer.stem_for("cn=a,o=b");
        let second = namer.stem_for("cn=a,o=b");

        assert_eq!(first, second);
        assert_eq!(first.stem, "cn_a_o_b");
        assert!(first.collided_with.is_none());
    }

    #[test]
    fn test_colliding_dns_are_disambiguated() {
        let mut namer = FileNamer::new(CollisionPolicy::Disambiguate);
        let first = namer.stem_for("cn=a,o=b");
        let second = namer.stem_for("cn=a_o=b");

        assert_eq!(first.stem, "cn_a_o_b");
        assert_ne!(second.stem, first.stem);
        assert!(second.stem.starts_with("cn_a_o_b_"));
        assert_eq!(second.stem.len(), "cn_a_o_b_".len() + COLLISION_SUFFIX_LEN);
        assert_eq!(second.collided_with.as_deref(), Some("cn=a,o=b"));

        // Deterministic across runs.
        let mut other = FileNamer::new(CollisionPolicy::Disambiguate);
        other.stem_for("cn=a,o=b");
        assert_eq!(other.stem_for("cn=a_o=b").stem, second.stem);
    }

    #[test]
    fn test_disambiguated_stem_is_not_handed_out_twice() {
        let mut namer = FileNamer::new(CollisionPolicy::Disambiguate);
        let first = namer.stem_for("cn=a,o=b");
        let second = namer.stem_for("cn=a_o=b");

        // Sanitizes to exactly the stem the second DN received.
        let lookalike = format!("cn=a,o=b_{}", &second.stem["cn_a_o_b_".len()..]);
        assert_eq!(sanitize_dn(&lookalike), second.stem);
        let third = namer.stem_for(&lookalike);

        assert_ne!(third.stem, first.stem);
        assert_ne!(third.stem, second.stem);
        assert_eq!(third.collided_with.as_deref(), Some("cn=a_o=b"));
        assert_eq!(namer.stem_for("cn=a_o=b").stem, second.stem);
    }

    #[test]
    fn test_lookalike_seen_first_keeps_collider_apart() {
        let mut reference = FileNamer::new(CollisionPolicy::Disambiguate);
        reference.stem_for("cn=a,o=b");
        let hashed = reference.stem_for("cn=a_o=b").stem;
        let lookalike = format!("cn=a,o=b_{}", &hashed["cn_a_o_b_".len()..]);

        let mut namer = FileNamer::new(CollisionPolicy::Disambiguate);
        let taken = namer.stem_for(&lookalike);
        let first = namer.stem_for("cn=a,o=b");
        let second = namer.stem_for("cn=a_o=b");

        assert_eq!(taken.stem, hashed);
        assert_eq!(first.stem, "cn_a_o_b");
        assert_ne!(second.stem, taken.stem);
        assert!(second.stem.starts_with(&hashed));
        assert_eq!(second.stem.len(), hashed.len() + 1);
    }

    #[test]
    fn test_overwrite_policy_reuses_stem() {
        let mut namer = FileNamer::new(CollisionPolicy::Overwrite);
        namer.stem_for("cn=a,o=b");
        let second = namer.stem_for("cn=a o=b");

        assert_eq!(second.stem, "cn_a_o_b");
        assert_eq!(second.collided_with.as_deref(), Some("cn=a,o=b"));
    }
}
