pub mod donors;
pub mod institutions;
pub mod recipients;

pub use donors::DonorService;
pub use institutions::InstitutionService;
pub use recipients::RecipientService;

use crate::models::RegistryError;

/// Trimmed value, `None` when blank.
pub(crate) fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn hash_error(err: impl std::fmt::Display) -> RegistryError {
    RegistryError::Hashing(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_drops_blank_values() {
        assert_eq!(clean(Some("  Ward 4 ")), Some("Ward 4"));
        assert_eq!(clean(Some("   ")), None);
        assert_eq!(clean(None), None);
    }
}
