//! Naming helpers for accessions, species keys, divisions and flags
//!
//! These helpers turn catalog values into the tokens used in FTP paths,
//! export keys and query filters. They are pure and cheap to call.

use crate::error::{GmcError, Result};
use regex::Regex;

/// Organism group names of the six Ensembl divisions.
pub const ENSEMBL_DIVISIONS: [&str; 6] = [
    "EnsemblBacteria",
    "EnsemblVertebrates",
    "EnsemblPlants",
    "EnsemblProtists",
    "EnsemblMetazoa",
    "EnsemblFungi",
];

const ACCESSION_PATTERN: &str = r"^(GCA|GCF)_(\d{3})(\d{3})(\d{3})\.(\d+)$";

/// Derive the relative FTP directory of an assembly from its accession.
///
/// The nine digit body is split into three groups and the version becomes the
/// last path component.
///
/// # Examples
///
/// ```
/// use gmc_common::naming::format_accession_path;
///
/// assert_eq!(format_accession_path("GCF_043381705.1").unwrap(), "GCF/043/381/705/1");
/// assert!(format_accession_path("GCX_043381705.1").is_err());
/// ```
pub fn format_accession_path(accession: &str) -> Result<String> {
    let pattern = Regex::new(ACCESSION_PATTERN)?;
    let captures = pattern
        .captures(accession)
        .ok_or_else(|| GmcError::InvalidAccession(accession.to_string()))?;

    let parts: Vec<&str> = (1..=5)
        .filter_map(|i| captures.get(i).map(|m| m.as_str()))
        .collect();

    Ok(parts.join("/"))
}

/// Check an accession without deriving anything from it.
pub fn is_valid_accession(accession: &str) -> bool {
    format_accession_path(accession).is_ok()
}

/// Turn a scientific name into a filesystem-safe species key.
///
/// Every run of characters that are neither letters nor digits becomes one
/// underscore and leading/trailing underscores are dropped, so the result is
/// stable under repeated application. Non-ASCII letters such as `é` are kept.
///
/// ```
/// use gmc_common::naming::normalize_species_name;
///
/// assert_eq!(
///     normalize_species_name("Escherichia coli str. K-12"),
///     "Escherichia_coli_str_K_12"
/// );
/// ```
pub fn normalize_species_name(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Canonicalise a division token to its organism group name.
///
/// A leading `ensembl` prefix is dropped regardless of case and the remainder is
/// capitalised, so `plants`, `EnsemblPlants` and `ensemblPLANTS` all map to
/// `EnsemblPlants`. Returns `None` for an empty token.
pub fn normalize_division(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let rest = match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ensembl") => &token[7..],
        _ => token,
    };

    let mut chars = rest.chars();
    let capitalised = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };

    Some(format!("Ensembl{}", capitalised))
}

/// Interpret an environment flag.
///
/// `f`, `false`, `no`, `none`, `0`, `n` and the empty string (any case,
/// surrounding whitespace ignored) are false; everything else is true.
pub fn parse_boolean_var(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "f" | "false" | "no" | "none" | "0" | "n" | ""
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_accession_path() {
        assert_eq!(format_accession_path("GCF_043381705.1").unwrap(), "GCF/043/381/705/1");
        assert_eq!(format_accession_path("GCA_000001405.29").unwrap(), "GCA/000/001/405/29");
    }

    #[test]
    fn test_format_accession_path_rejects_malformed() {
        for bad in [
            "",
            "GCX_043381705.1",
            "GCF_04338170.1",
            "GCF_0433817051.1",
            "GCF_04338a705.1",
            "GCF_043381705",
            "GCF_043381705.",
            "gcf_043381705.1",
            " GCF_043381705.1",
        ] {
            assert_eq!(
                format_accession_path(bad),
                Err(GmcError::InvalidAccession(bad.to_string())),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_normalize_species_name() {
        assert_eq!(normalize_species_name("Escherichia coli str. K-12"), "Escherichia_coli_str_K_12");
        assert_eq!(normalize_species_name("Homo sapiens"), "Homo_sapiens");
        assert_eq!(normalize_species_name("  Mus  musculus.. "), "Mus_musculus");
        assert_eq!(normalize_species_name("___"), "");
        assert_eq!(normalize_species_name("Hyalella azteca (Saussure, 1858) café"), "Hyalella_azteca_Saussure_1858_café");
        assert_eq!(normalize_species_name("Pañuelo  sp."), "Pañuelo_sp");
        assert_eq!(normalize_species_name(""), "");
    }

    #[test]
    fn test_normalize_division() {
        for token in ["plants", "Plants", "EnsemblPlants", "ensemblPlants", "ENSEMBLplants"] {
            assert_eq!(normalize_division(token).as_deref(), Some("EnsemblPlants"), "{token}");
        }
        assert_eq!(normalize_division("vertebrates").as_deref(), Some("EnsemblVertebrates"));
        assert_eq!(normalize_division(""), None);
        assert_eq!(normalize_division("Ensembl").as_deref(), Some("Ensembl"));
    }

    #[test]
    fn test_parse_boolean_var() {
        for falsy in ["f", "False", "NO", "none", "0", "n", "", "  "] {
            assert!(!parse_boolean_var(falsy), "{falsy:?}");
        }
        for truthy in ["t", "true", "yes", "1", "on"] {
            assert!(parse_boolean_var(truthy), "{truthy:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "\\PC*") {
            let once = normalize_species_name(&s);
            prop_assert_eq!(normalize_species_name(&once), once.clone());
            prop_assert!(!once.starts_with('_') && !once.ends_with('_'));
            prop_assert!(!once.contains("__"));
        }

        #[test]
        fn prop_accession_path_has_five_components(
            prefix in prop_oneof![Just("GCA"), Just("GCF")],
            body in "[0-9]{9}",
            version in 1u32..1000,
        ) {
            let accession = format!("{prefix}_{body}.{version}");
            let path = format_accession_path(&accession).unwrap();
            let parts: Vec<&str> = path.split('/').collect();
            prop_assert_eq!(parts.len(), 5);
            prop_assert_eq!(parts[0], prefix);
            prop_assert_eq!(parts[1..4].concat(), body);
            prop_assert_eq!(parts[4], version.to_string());
        }
    }
}
