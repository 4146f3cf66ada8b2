//! # Specialty Names
//!
//! Imported specialty names often carry regional suffixes and office codes,
//! e.g. `"Καρδιολογία (GR)GR0028"`. These rules detect such variants (to keep
//! them out of reports) and rewrite them to `"<base> <region>"`.

use regex::Regex;

pub const DEFAULT_REGION: &str = "Αττικη";

const KNOWN_REGIONS: [&str; 4] = ["Αττικη", "Αθήνα", "Θεσσαλονίκη", "Πειραιάς"];

const REGIONAL_VARIANT: &str = r"(?i)\(GR\)|GR\d+|ATT\.\w+|ATH\.\w+|PIR\.\w+|\b(?:WEST|NORTH|SOUTH|EAST|KOLONAKI)\b|CENT\.|SUB\.|S-E\.|S-W\.|W\.\d*|\d+\s*$";

/// Stripped in order; each match is replaced by a single space.
const CODE_PATTERNS: [&str; 16] = [
    r"(?i)\s*\(GR\)\s*",
    r"(?i)\s*GR\d+\s*",
    r"(?i)\s*ATT\.\w+\s*",
    r"(?i)\s*ATH\.\w+\.?\d*\s*",
    r"(?i)\s*PIR\.\w+\.?\w*\s*",
    r"(?i)\s*WEST\s*",
    r"(?i)\s*NORTH\s*",
    r"(?i)\s*SOUTH\s*",
    r"(?i)\s*EAST\s*",
    r"(?i)\s*CENT\.?\w*\s*",
    r"(?i)\s*SUB\.?\w*\s*",
    r"(?i)\s*KOLONAKI\s*",
    r"(?i)\s*S-E\.\s*",
    r"(?i)\s*S-W\.\d*\s*",
    r"(?i)\s*W\.\d*\s*",
    r"\d+\s*",
];

#[derive(Debug, Clone)]
pub struct SpecialtyRules {
    regional_variant: Regex,
    codes: Vec<Regex>,
    regions: Vec<Regex>,
    whitespace: Regex,
}

impl SpecialtyRules {
    pub fn new() -> Result<Self, regex::Error> {
        let codes = CODE_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let regions = KNOWN_REGIONS
            .iter()
            .map(|r| Regex::new(&format!(r"(?i)\s*{}\s*", regex::escape(r))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            regional_variant: Regex::new(REGIONAL_VARIANT)?,
            codes,
            regions,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// True for names carrying a region or office code. Such names are left
    /// out of the per-specialty report.
    pub fn is_regional_variant(&self, specialty: &str) -> bool {
        self.regional_variant.is_match(specialty)
    }

    /// Rewrites `specialty` to its base name followed by `region`.
    ///
    /// Returns the input unchanged when nothing remains after stripping.
    pub fn normalize(&self, specialty: &str, region: &str) -> String {
        if specialty.trim().is_empty() {
            return specialty.to_string();
        }

        let mut base = specialty.to_string();
        for code in &self.codes {
            base = code.replace_all(&base, " ").into_owned();
        }
        base = self.whitespace.replace_all(&base, " ").trim().to_string();
        for known in &self.regions {
            base = known.replace_all(&base, " ").trim().to_string();
        }
        base = self.whitespace.replace_all(&base, " ").into_owned();

        match (base.is_empty(), region.trim().is_empty()) {
            (false, false) => format!("{base} {}", region.trim()),
            (false, true) => base,
            (true, _) => specialty.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_codes_and_appends_region() {
        let rules = SpecialtyRules::new().unwrap();
        assert_eq!(
            rules.normalize("Καρδιολογία (GR)GR0028", DEFAULT_REGION),
            "Καρδιολογία Αττικη"
        );
        assert_eq!(
            rules.normalize("Οφθαλμολογία ATT.NORTH 12", "Θεσσαλονίκη"),
            "Οφθαλμολογία Θεσσαλονίκη"
        );
    }

    #[test]
    fn test_normalize_replaces_existing_region_and_is_stable() {
        let rules = SpecialtyRules::new().unwrap();
        let once = rules.normalize("Δερματολογία Αθήνα", DEFAULT_REGION);
        assert_eq!(once, "Δερματολογία Αττικη");
        assert_eq!(rules.normalize(&once, DEFAULT_REGION), once);
    }

    #[test]
    fn test_normalize_keeps_input_when_nothing_remains() {
        let rules = SpecialtyRules::new().unwrap();
        assert_eq!(rules.normalize("GR0028", DEFAULT_REGION), "GR0028");
        assert_eq!(rules.normalize("", DEFAULT_REGION), "");
    }

    #[test]
    fn test_regional_variants_are_detected() {
        let rules = SpecialtyRules::new().unwrap();
        for name in [
            "Καρδιολογία (GR)GR0028",
            "Cardiology GR27",
            "Cardiology ATT.CENTER",
            "Cardiology NORTH",
            "Cardiology kolonaki",
            "Cardiology S-W.",
            "Cardiology W.3",
            "Cardiology 12",
        ] {
            assert!(rules.is_regional_variant(name), "{name} should be filtered");
        }
        for name in ["Cardiology", "Καρδιολογία Αττικη", "Northern Medicine"] {
            assert!(!rules.is_regional_variant(name), "{name} should be kept");
        }
    }
}
