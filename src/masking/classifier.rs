//! Field classification
//!
//! Maps a field name to a sensitivity category by case-insensitive keyword
//! matching. The system masks arbitrary query results, so this stands in for
//! a schema: every field name resolves to exactly one category, with
//! "generic" as the catch-all.

use regex::Regex;

/// Sensitivity category of a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// SSN and friends: identifiers whose exposure is directly harmful.
    IdentifierOfHarm,
    Financial,
    ContactEmail,
    ContactPhone,
    DemographicRace,
    DemographicGender,
    Generic,
}

/// Classification seam. Tests substitute a fixed classifier so masking tests
/// don't couple to the keyword patterns.
pub trait FieldClassifier: Send + Sync {
    fn classify(&self, field: &str) -> FieldCategory;
}

/// Keyword-pattern classifier over field names.
pub struct KeywordClassifier {
    ssn: Regex,
    financial: Regex,
    email: Regex,
    phone: Regex,
    race: Regex,
    gender: Regex,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        // Patterns are fixed at build time; compilation cannot fail.
        Self {
            ssn: Regex::new(r"(?i)ssn|social").unwrap(),
            financial: Regex::new(r"(?i)salary|wage|income|comp").unwrap(),
            email: Regex::new(r"(?i)email").unwrap(),
            phone: Regex::new(r"(?i)phone|mobile|cell").unwrap(),
            race: Regex::new(r"(?i)race|ethnicity").unwrap(),
            gender: Regex::new(r"(?i)gender|sex").unwrap(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldClassifier for KeywordClassifier {
    fn classify(&self, field: &str) -> FieldCategory {
        if self.ssn.is_match(field) {
            FieldCategory::IdentifierOfHarm
        } else if self.financial.is_match(field) {
            FieldCategory::Financial
        } else if self.email.is_match(field) {
            FieldCategory::ContactEmail
        } else if self.phone.is_match(field) {
            FieldCategory::ContactPhone
        } else if self.race.is_match(field) {
            FieldCategory::DemographicRace
        } else if self.gender.is_match(field) {
            FieldCategory::DemographicGender
        } else {
            FieldCategory::Generic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories() {
        let c = KeywordClassifier::new();
        assert_eq!(c.classify("ssn"), FieldCategory::IdentifierOfHarm);
        assert_eq!(c.classify("social_security_number"), FieldCategory::IdentifierOfHarm);
        assert_eq!(c.classify("annual_salary"), FieldCategory::Financial);
        assert_eq!(c.classify("hourly_wage"), FieldCategory::Financial);
        assert_eq!(c.classify("total_compensation"), FieldCategory::Financial);
        assert_eq!(c.classify("work_email"), FieldCategory::ContactEmail);
        assert_eq!(c.classify("mobile_number"), FieldCategory::ContactPhone);
        assert_eq!(c.classify("CELL_PHONE"), FieldCategory::ContactPhone);
        assert_eq!(c.classify("ethnicity"), FieldCategory::DemographicRace);
        assert_eq!(c.classify("gender"), FieldCategory::DemographicGender);
        assert_eq!(c.classify("sex"), FieldCategory::DemographicGender);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let c = KeywordClassifier::new();
        assert_eq!(c.classify("SSN"), FieldCategory::IdentifierOfHarm);
        assert_eq!(c.classify("Salary"), FieldCategory::Financial);
        assert_eq!(c.classify("EMAIL_ADDR"), FieldCategory::ContactEmail);
    }

    #[test]
    fn test_unmatched_names_are_generic() {
        let c = KeywordClassifier::new();
        for field in ["id", "first_name", "department", "job_title", "hire_date"] {
            assert_eq!(c.classify(field), FieldCategory::Generic, "{}", field);
        }
    }
}
