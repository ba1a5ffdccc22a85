//! Machine type normalization.
//!
//! Billing records name machine types differently from the compute API
//! (`BASIC.A2`, `A3`, ...). Canonical rules turn them into the API form and
//! family rules list the other sizes that share the canonical size's price.

use crate::error::{ProductInfoError, Result};
use regex::Regex;

/// How a matching raw machine type is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonicalize {
    /// `BASIC.A2` -> `Basic_A2`
    TitleCaseFamily,
    /// `A3` -> `Standard_A3`
    Prefix(String),
}

#[derive(Debug, Clone)]
pub struct CanonicalRule {
    pattern: Regex,
    transform: Canonicalize,
}

impl CanonicalRule {
    pub fn new(pattern: &str, transform: Canonicalize) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            transform,
        })
    }

    fn apply(&self, mt: &str) -> String {
        match &self.transform {
            Canonicalize::TitleCaseFamily => {
                match mt.split_once(|c: char| !c.is_ascii_alphanumeric()) {
                    Some((family, size)) => format!("{}_{}", title_case(family), size),
                    None => mt.to_string(),
                }
            }
            Canonicalize::Prefix(prefix) => format!("{prefix}{mt}"),
        }
    }
}

/// One step of variant generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Append each suffix to the size part, keeping any version tail
    Suffix(Vec<String>),
    /// Rename the family, emit the renamed type, then its suffixed forms
    Rename {
        from: String,
        to: String,
        suffixes: Vec<String>,
    },
    /// Strip `trim` from the end, then append each suffix
    Rebase { trim: String, suffixes: Vec<String> },
}

impl Expansion {
    pub fn suffix(suffixes: &[&str]) -> Self {
        Self::Suffix(owned(suffixes))
    }

    pub fn rename(from: &str, to: &str, suffixes: &[&str]) -> Self {
        Self::Rename {
            from: from.to_string(),
            to: to.to_string(),
            suffixes: owned(suffixes),
        }
    }

    pub fn rebase(trim: &str, suffixes: &[&str]) -> Self {
        Self::Rebase {
            trim: trim.to_string(),
            suffixes: owned(suffixes),
        }
    }

    fn expand(&self, mt: &str, out: &mut Vec<String>) {
        match self {
            Expansion::Suffix(suffixes) => {
                out.extend(suffixes.iter().map(|s| add_suffix(mt, s)));
            }
            Expansion::Rename { from, to, suffixes } => {
                let renamed = mt.replace(from.as_str(), to);
                let suffixed: Vec<String> =
                    suffixes.iter().map(|s| add_suffix(&renamed, s)).collect();
                out.push(renamed);
                out.extend(suffixed);
            }
            Expansion::Rebase { trim, suffixes } => {
                let base = mt.strip_suffix(trim.as_str()).unwrap_or(mt);
                out.extend(suffixes.iter().map(|s| add_suffix(base, s)));
            }
        }
    }
}

/// Variant rule of one machine type family
#[derive(Debug, Clone)]
pub struct FamilyRule {
    pattern: Regex,
    /// When non-empty, the type must also end with one of these
    required_endings: Vec<String>,
    expansions: Vec<Expansion>,
}

impl FamilyRule {
    pub fn new(pattern: &str, expansions: Vec<Expansion>) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            required_endings: Vec::new(),
            expansions,
        })
    }

    pub fn ending_with(mut self, endings: &[&str]) -> Self {
        self.required_endings = owned(endings);
        self
    }

    fn matches(&self, mt: &str) -> bool {
        self.pattern.is_match(mt)
            && (self.required_endings.is_empty()
                || self.required_endings.iter().any(|e| mt.ends_with(e.as_str())))
    }
}

/// Ordered rule set; the first matching rule wins
#[derive(Debug, Clone)]
pub struct MachineTypeRules {
    pub canonical: Vec<CanonicalRule>,
    pub families: Vec<FamilyRule>,
}

impl MachineTypeRules {
    /// Azure VM size naming
    pub fn azure() -> Result<Self> {
        let canonical = vec![
            CanonicalRule::new(r"^BASIC.A\d+[_Promo]*$", Canonicalize::TitleCaseFamily)?,
            CanonicalRule::new(r"^A\d+[_Promo]*$", Canonicalize::Prefix("Standard_".to_string()))?,
        ];

        let families = vec![
            FamilyRule::new(
                r"^Standard_B\d+m?[_v\d]*[_Promo]*$",
                vec![Expansion::suffix(&["s"])],
            )?,
            FamilyRule::new(
                r"^Standard_D\d[_v\d]*[_Promo]*$",
                vec![
                    Expansion::suffix(&["s"]),
                    Expansion::rename("Standard_D", "Standard_DS", &["-1", "-2", "-4", "-8"]),
                ],
            )?,
            FamilyRule::new(
                r"^Standard_E\d+i?[_v\d]*[_Promo]*$",
                vec![Expansion::suffix(&["s", "-2s", "-4s", "-8s", "-16s", "-32s"])],
            )?,
            FamilyRule::new(
                r"^Standard_F\d+[_v\d]*[_Promo]*$",
                vec![Expansion::suffix(&["s"])],
            )?,
            FamilyRule::new(
                r"^Standard_G\d+[_v\d]*[_Promo]*$",
                vec![Expansion::rename("Standard_G", "Standard_GS", &["-4", "-8", "-16"])],
            )?,
            FamilyRule::new(
                r"^Standard_L\d+[_v\d]*[_Promo]*$",
                vec![Expansion::suffix(&["s"])],
            )?,
            FamilyRule::new(
                r"^Standard_M\d+[m|t|l]*s[_v\d]*[_Promo]*$",
                vec![Expansion::rebase("ms", &["-2ms", "-4ms", "-8ms", "-16ms", "-32ms"])],
            )?
            .ending_with(&["ms"]),
            // constrained M sizes have no priced variants
            FamilyRule::new(r"^Standard_M\d+[m|t|l]*s[_v\d]*[_Promo]*$", Vec::new())?
                .ending_with(&["ls", "ts"]),
            FamilyRule::new(
                r"^Standard_M\d+[m|t|l]*s[_v\d]*[_Promo]*$",
                vec![Expansion::rebase("s", &["", "m"])],
            )?
            .ending_with(&["s"]),
            FamilyRule::new(
                r"^Standard_N[C|D|V]\d+r?[_v\d]*[_Promo]*$",
                vec![Expansion::suffix(&["s"])],
            )?,
        ];

        Ok(Self {
            canonical,
            families,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MachineTypeNormalizer {
    rules: MachineTypeRules,
}

impl MachineTypeNormalizer {
    pub fn new(rules: MachineTypeRules) -> Self {
        Self { rules }
    }

    /// Rewrite a billing machine type into its canonical name. Types no rule
    /// matches are returned unchanged.
    pub fn canonicalize(&self, raw: &str) -> String {
        self.rules
            .canonical
            .iter()
            .find(|rule| rule.pattern.is_match(raw))
            .map(|rule| rule.apply(raw))
            .unwrap_or_else(|| raw.to_string())
    }

    /// Other machine types priced the same as `canonical`
    pub fn variants(&self, canonical: &str) -> Vec<String> {
        let Some(rule) = self.rules.families.iter().find(|rule| rule.matches(canonical)) else {
            return Vec::new();
        };

        let mut variants = Vec::new();
        for expansion in &rule.expansions {
            expansion.expand(canonical, &mut variants);
        }
        variants
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ProductInfoError::Config(format!("invalid machine type pattern {pattern}: {e}")))
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Standard_D2_v2` + `s` -> `Standard_D2s_v2`
fn add_suffix(mt: &str, suffix: &str) -> String {
    let mut parts = mt.splitn(3, '_');
    let family = parts.next().unwrap_or_default();
    match parts.next() {
        Some(size) => {
            let tail = parts.next().map(|t| format!("_{t}")).unwrap_or_default();
            format!("{family}_{size}{suffix}{tail}")
        }
        None => format!("{family}{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> MachineTypeNormalizer {
        MachineTypeNormalizer::new(MachineTypeRules::azure().unwrap())
    }

    #[test]
    fn test_canonicalize_basic_tier() {
        let n = normalizer();
        assert_eq!(n.canonicalize("BASIC.A2"), "Basic_A2");
        assert_eq!(n.canonicalize("BASIC.A4_Promo"), "Basic_A4_Promo");
    }

    #[test]
    fn test_canonicalize_standard_a() {
        let n = normalizer();
        assert_eq!(n.canonicalize("A3"), "Standard_A3");
        assert_eq!(n.canonicalize("A10_Promo"), "Standard_A10_Promo");
    }

    #[test]
    fn test_canonicalize_passes_other_types_through() {
        let n = normalizer();
        assert_eq!(n.canonicalize("Standard_D2_v3"), "Standard_D2_v3");
        assert_eq!(n.canonicalize("something-else"), "something-else");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let n = normalizer();
        for raw in ["BASIC.A2", "A3", "A7_Promo", "Standard_D2", "Standard_M64ms", "x"] {
            let once = n.canonicalize(raw);
            assert_eq!(n.canonicalize(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_d_family_variants() {
        let variants = normalizer().variants("Standard_D2");
        assert_eq!(
            variants,
            vec![
                "Standard_D2s",
                "Standard_DS2",
                "Standard_DS2-1",
                "Standard_DS2-2",
                "Standard_DS2-4",
                "Standard_DS2-8",
            ]
        );
    }

    #[test]
    fn test_variants_keep_version_tail() {
        let variants = normalizer().variants("Standard_D2_v2");
        assert_eq!(variants[0], "Standard_D2s_v2");
        assert_eq!(variants[1], "Standard_DS2_v2");
        assert_eq!(variants[5], "Standard_DS2-8_v2");
    }

    #[test]
    fn test_e_and_g_family_variants() {
        let n = normalizer();
        assert_eq!(
            n.variants("Standard_E8_v3"),
            vec![
                "Standard_E8s_v3",
                "Standard_E8-2s_v3",
                "Standard_E8-4s_v3",
                "Standard_E8-8s_v3",
                "Standard_E8-16s_v3",
                "Standard_E8-32s_v3",
            ]
        );
        assert_eq!(
            n.variants("Standard_G5"),
            vec!["Standard_GS5", "Standard_GS5-4", "Standard_GS5-8", "Standard_GS5-16"]
        );
    }

    #[test]
    fn test_single_suffix_families() {
        let n = normalizer();
        assert_eq!(n.variants("Standard_B2"), vec!["Standard_B2s"]);
        assert_eq!(n.variants("Standard_F4"), vec!["Standard_F4s"]);
        assert_eq!(n.variants("Standard_L8"), vec!["Standard_L8s"]);
        assert_eq!(n.variants("Standard_NC6"), vec!["Standard_NC6s"]);
    }

    #[test]
    fn test_m_family_variants() {
        let n = normalizer();
        assert_eq!(
            n.variants("Standard_M64ms"),
            vec![
                "Standard_M64-2ms",
                "Standard_M64-4ms",
                "Standard_M64-8ms",
                "Standard_M64-16ms",
                "Standard_M64-32ms",
            ]
        );
        assert!(n.variants("Standard_M64ls").is_empty());
        assert!(n.variants("Standard_M32ts").is_empty());
        assert_eq!(n.variants("Standard_M64s"), vec!["Standard_M64", "Standard_M64m"]);
    }

    #[test]
    fn test_unknown_family_has_no_variants() {
        let n = normalizer();
        assert!(n.variants("Basic_A2").is_empty());
        assert!(n.variants("Standard_H16").is_empty());
    }

    #[test]
    fn test_variants_are_stable() {
        let n = normalizer();
        assert_eq!(n.variants("Standard_D2"), n.variants("Standard_D2"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = MachineTypeRules {
            canonical: vec![
                CanonicalRule::new(r"^X\d+$", Canonicalize::Prefix("Custom_".to_string())).unwrap(),
            ],
            families: vec![FamilyRule::new(
                r"^Custom_X\d+$",
                vec![Expansion::suffix(&["a", "b"])],
            )
            .unwrap()],
        };
        let n = MachineTypeNormalizer::new(rules);

        assert_eq!(n.canonicalize("X1"), "Custom_X1");
        assert_eq!(n.variants("Custom_X1"), vec!["Custom_X1a", "Custom_X1b"]);
        assert!(n.variants("Standard_D2").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = CanonicalRule::new("(", Canonicalize::TitleCaseFamily).unwrap_err();
        assert!(matches!(err, ProductInfoError::Config(_)));
    }
}
