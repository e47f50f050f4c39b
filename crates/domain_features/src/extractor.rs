//! Deterministic feature extraction
//!
//! # Vector layout
//!
//! ```text
//! [sessions, amount, age, conditions, smoker, exercise,
//!  sev0, sev1, sev2, duration_months, plan_min, plan_max]
//! ```

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, warn};

use crate::coerce;
use crate::error::{FeatureExtractionError, RecordKind};
use crate::records::{ClaimRecord, PolicyholderRecord};
use crate::vector::{FeatureVector, FEATURE_COUNT};

const MAX_SEVERITY: i64 = 5;
const DEFAULT_DURATION_MONTHS: f32 = 1.0;

/// Extraction settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionConfig {
    /// Timezone applied to birth dates stored without an offset
    pub timezone: Tz,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

/// A feature vector plus every field that fell back to a default
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub features: FeatureVector,
    pub defaulted: Vec<FeatureExtractionError>,
}

impl Extraction {
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// Turns a (claim, policyholder) pair into a [`FeatureVector`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    config: ExtractionConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extracts features with ages computed against the current time
    pub fn extract(
        &self,
        claim: &ClaimRecord,
        holder: &PolicyholderRecord,
    ) -> Result<Extraction, FeatureExtractionError> {
        self.extract_at(claim, holder, Utc::now())
    }

    /// Extracts features with ages computed against `as_of`
    ///
    /// # Errors
    ///
    /// Only [`FeatureExtractionError::MissingGroup`]; malformed field values
    /// are replaced by defaults and listed in [`Extraction::defaulted`].
    pub fn extract_at(
        &self,
        claim: &ClaimRecord,
        holder: &PolicyholderRecord,
        as_of: DateTime<Utc>,
    ) -> Result<Extraction, FeatureExtractionError> {
        let treatment = claim.treatment_details.as_ref().ok_or_else(|| {
            FeatureExtractionError::missing_group(RecordKind::Claim, claim.id, "treatmentDetails")
        })?;
        let financial = claim.financial_info.as_ref().ok_or_else(|| {
            FeatureExtractionError::missing_group(RecordKind::Claim, claim.id, "financialInfo")
        })?;
        let health = holder.health.as_ref().ok_or_else(|| {
            FeatureExtractionError::missing_group(RecordKind::Policyholder, holder.id, "health")
        })?;
        let range = holder
            .plan
            .as_ref()
            .ok_or_else(|| {
                FeatureExtractionError::missing_group(RecordKind::Policyholder, holder.id, "plan")
            })?
            .range
            .as_ref()
            .ok_or_else(|| {
                FeatureExtractionError::missing_group(RecordKind::Policyholder, holder.id, "plan.range")
            })?;

        let mut fields = FieldReader::default();
        let claim_id = claim.id.to_string();
        let holder_id = holder.id.to_string();

        let sessions = fields.read(
            RecordKind::Claim, &claim_id, "sessionsAttended",
            &treatment.sessions_attended, coerce::as_integer, 0,
        );
        let total_paid = fields.read(
            RecordKind::Claim, &claim_id, "totalAmountPaid",
            &financial.total_amount_paid, coerce::as_number, 0.0,
        );
        let severity = fields.read(
            RecordKind::Claim, &claim_id, "caseSeverity",
            &treatment.case_severity, coerce::as_integer, 0,
        );
        let duration = fields.read(
            RecordKind::Claim, &claim_id, "treatmentDuration",
            &treatment.treatment_duration, parse_duration_months, DEFAULT_DURATION_MONTHS,
        );

        let timezone = self.config.timezone;
        let age = fields.read(
            RecordKind::Policyholder, &holder_id, "birthDate",
            &holder.birth_date, |v| coerce::as_datetime(v, timezone).map(|b| age_at(b, as_of)), 0,
        );
        let conditions = fields.read(
            RecordKind::Policyholder, &holder_id, "health.conditions",
            &health.conditions, coerce::count_conditions, 0,
        );
        let smoker = fields.read(
            RecordKind::Policyholder, &holder_id, "health.smoker",
            &health.smoker, coerce::as_flag, false,
        );
        let exercise = fields.read(
            RecordKind::Policyholder, &holder_id, "health.exercise",
            &health.exercise, exercise_level, 0,
        );
        let plan_min = fields.read(
            RecordKind::Policyholder, &holder_id, "plan.range.min",
            &range.min, coerce::as_integer, 0,
        );
        let plan_max = fields.read(
            RecordKind::Policyholder, &holder_id, "plan.range.max",
            &range.max, coerce::as_integer, 0,
        );

        let mut values = [0.0f32; FEATURE_COUNT];
        values[0] = sessions as f32;
        values[1] = total_paid as f32;
        values[2] = age as f32;
        values[3] = conditions as f32;
        values[4] = if smoker { 1.0 } else { 0.0 };
        values[5] = exercise as f32;
        values[6 + severity_bucket(severity)] = 1.0;
        values[9] = duration;
        values[10] = percent_to_fraction(plan_min);
        values[11] = percent_to_fraction(plan_max);

        let features = FeatureVector::new(values);
        debug!(claim_id = %claim.id, features = ?features.as_array(), "Extracted features");

        Ok(Extraction {
            features,
            defaulted: fields.defaulted,
        })
    }
}

/// Collects defaulted fields while reading values
#[derive(Default)]
struct FieldReader {
    defaulted: Vec<FeatureExtractionError>,
}

impl FieldReader {
    fn read<T: std::fmt::Debug>(
        &mut self,
        record: RecordKind,
        id: &str,
        field: &'static str,
        value: &Value,
        parse: impl FnOnce(&Value) -> Option<T>,
        default: T,
    ) -> T {
        match parse(value) {
            Some(parsed) => parsed,
            None => {
                warn!(%record, id, field, value = %value, ?default, "Unusable field value, using default");
                self.defaulted
                    .push(FeatureExtractionError::invalid_field(record, id, field, value));
                default
            }
        }
    }
}

/// Clamps a severity into [0, 5] and buckets it by halves
pub fn severity_bucket(severity: i64) -> usize {
    match severity.clamp(0, MAX_SEVERITY) {
        0 | 1 => 0,
        2 | 3 => 1,
        _ => 2,
    }
}

/// Parses "<number> <unit>" into months; weeks are divided by four
///
/// A bare number is read as months. Returns `None` for anything that does
/// not start with a finite number.
pub fn parse_duration_months(value: &Value) -> Option<f32> {
    let months = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let mut parts = s.split_whitespace();
            let amount: f64 = parts.next()?.parse().ok()?;
            let unit = parts.next().map(str::to_ascii_lowercase);
            match unit.as_deref() {
                Some("week") | Some("weeks") => amount / 4.0,
                _ => amount,
            }
        }
        _ => return None,
    };
    let months = months as f32;
    months.is_finite().then_some(months)
}

fn exercise_level(value: &Value) -> Option<u8> {
    match value.as_str()? {
        "Often" => Some(2),
        "Sometimes" => Some(1),
        "Never" => Some(0),
        _ => None,
    }
}

/// Whole years elapsed, evaluated in the birth date's own offset
fn age_at(birth: DateTime<FixedOffset>, as_of: DateTime<Utc>) -> i32 {
    let today = as_of.with_timezone(birth.offset());
    let birthday_pending = (today.month(), today.day()) < (birth.month(), birth.day());
    let age = today.year() - birth.year() - i32::from(birthday_pending);
    age.max(0)
}

fn percent_to_fraction(percent: i64) -> f32 {
    (percent as f32 / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_severity_buckets() {
        assert_eq!(severity_bucket(-3), 0);
        assert_eq!(severity_bucket(1), 0);
        assert_eq!(severity_bucket(2), 1);
        assert_eq!(severity_bucket(3), 1);
        assert_eq!(severity_bucket(4), 2);
        assert_eq!(severity_bucket(9), 2);
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_months(&json!("8 weeks")), Some(2.0));
        assert_eq!(parse_duration_months(&json!("1 Week")), Some(0.25));
        assert_eq!(parse_duration_months(&json!("3 months")), Some(3.0));
        assert_eq!(parse_duration_months(&json!("2.5")), Some(2.5));
        assert_eq!(parse_duration_months(&json!("10 days")), Some(10.0));
        assert_eq!(parse_duration_months(&json!(4)), Some(4.0));
        assert_eq!(parse_duration_months(&json!("garbage")), None);
        assert_eq!(parse_duration_months(&json!("inf weeks")), None);
        assert_eq!(parse_duration_months(&json!("")), None);
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let birth = Utc.with_ymd_and_hms(1990, 6, 15, 0, 0, 0).unwrap().fixed_offset();
        let before = Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap();
        let on = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(age_at(birth, before), 33);
        assert_eq!(age_at(birth, on), 34);
    }

    #[test]
    fn test_age_uses_birth_offset() {
        // 23:30 UTC on June 14 is already June 15 at +02:00
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let birth = offset.with_ymd_and_hms(1990, 6, 15, 0, 0, 0).unwrap();
        let as_of = Utc.with_ymd_and_hms(2024, 6, 14, 23, 30, 0).unwrap();
        assert_eq!(age_at(birth, as_of), 34);
    }

    #[test]
    fn test_future_birth_date_clamps_to_zero() {
        let birth = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().fixed_offset();
        let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(age_at(birth, as_of), 0);
    }

    #[test]
    fn test_plan_percentages_clamped() {
        assert_eq!(percent_to_fraction(40), 0.4);
        assert_eq!(percent_to_fraction(150), 1.0);
        assert_eq!(percent_to_fraction(-10), 0.0);
    }
}
