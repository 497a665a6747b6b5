//! Row masker
//!
//! Applies a masking level to one row at a time. Never mutates its input,
//! never transforms nulls, and is idempotent at every level: the redaction
//! sentinel and the bucket labels are stable values, so re-masking already
//! masked output is a no-op.

use serde_json::{Map, Value};

use crate::masking::classifier::{FieldCategory, FieldClassifier};
use crate::masking::MaskingLevel;

/// Fixed one-way redaction sentinel.
pub const REDACTED: &str = "REDACTED";

pub struct RowMasker<'a> {
    classifier: &'a dyn FieldClassifier,
    salary_bucket_width: u64,
}

impl<'a> RowMasker<'a> {
    pub fn new(classifier: &'a dyn FieldClassifier, salary_bucket_width: u64) -> Self {
        Self {
            classifier,
            // A zero width would collapse every amount into one bucket label
            // that re-parses as a number; keep buckets at least 1 wide.
            salary_bucket_width: salary_bucket_width.max(1),
        }
    }

    pub fn mask_rows(&self, rows: &[Map<String, Value>], level: MaskingLevel) -> Vec<Map<String, Value>> {
        rows.iter().map(|row| self.mask_row(row, level)).collect()
    }

    /// Transform one row according to the masking level.
    pub fn mask_row(&self, row: &Map<String, Value>, level: MaskingLevel) -> Map<String, Value> {
        if level == MaskingLevel::None {
            return row.clone();
        }

        row.iter()
            .map(|(field, value)| {
                let masked = if value.is_null() {
                    value.clone()
                } else {
                    self.mask_field(field, value, level)
                };
                (field.clone(), masked)
            })
            .collect()
    }

    fn mask_field(&self, field: &str, value: &Value, level: MaskingLevel) -> Value {
        let category = self.classifier.classify(field);

        match level {
            MaskingLevel::None => value.clone(),

            // Only identifiers-of-harm are touched at low.
            MaskingLevel::Low => match category {
                FieldCategory::IdentifierOfHarm => redacted(),
                _ => value.clone(),
            },

            // Identifiers redacted, financials coarsened, demographics
            // reduced; contact and generic fields stay visible.
            MaskingLevel::Medium => match category {
                FieldCategory::IdentifierOfHarm => redacted(),
                FieldCategory::Financial => bucket_amount(value, self.salary_bucket_width),
                FieldCategory::DemographicRace => redacted(),
                FieldCategory::DemographicGender => bucket_gender(value),
                _ => value.clone(),
            },

            // Everything sensitive goes; generic text goes too. Numeric
            // values (primary keys and the like) stay visible so joins and
            // pagination remain usable.
            MaskingLevel::High => match category {
                FieldCategory::IdentifierOfHarm
                | FieldCategory::Financial
                | FieldCategory::ContactEmail
                | FieldCategory::ContactPhone
                | FieldCategory::DemographicRace
                | FieldCategory::DemographicGender => redacted(),
                FieldCategory::Generic => {
                    if value.is_string() {
                        redacted()
                    } else {
                        value.clone()
                    }
                }
            },
        }
    }
}

fn redacted() -> Value {
    Value::String(REDACTED.to_string())
}

/// Floor a financial amount to a coarse fixed-width range label. Bucket
/// labels don't parse back as numbers, which is what makes a second pass a
/// no-op. Values that are neither numbers nor numeric strings pass through.
fn bucket_amount(value: &Value, width: u64) -> Value {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(amount) if amount.is_finite() => {
            let width = width as f64;
            let lo = (amount / width).floor() * width;
            Value::String(format!("{}-{}", lo as i64, (lo + width - 1.0) as i64))
        }
        _ => value.clone(),
    }
}

/// Reduce gender/sex to a single-letter bucket ("M."). Already-bucketed
/// values map to themselves.
fn bucket_gender(value: &Value) -> Value {
    match value {
        Value::String(s) => match s.chars().next() {
            Some(first) => Value::String(format!("{}.", first)),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}
