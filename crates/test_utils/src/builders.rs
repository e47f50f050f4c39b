//! Test Data Builders
//!
//! Builders assemble records in their stored JSON shape and deserialize
//! them, so tests exercise the same field names the intake system writes.
//! Tests specify only the fields they care about.

use serde_json::{json, Map, Value};

use core_kernel::{ClaimId, PolicyholderId};
use domain_features::{ClaimRecord, PolicyholderRecord};

use crate::fixtures::IdFixtures;

/// Builder for claim (medical bulletin) records
#[derive(Debug, Clone)]
pub struct ClaimRecordBuilder {
    id: ClaimId,
    policyholder_id: PolicyholderId,
    sessions_attended: Value,
    case_severity: Value,
    treatment_duration: Value,
    total_amount_paid: Value,
    reimbursement_class: Option<Value>,
    reimbursement_amount: Option<Value>,
    treatment_details: bool,
    financial_info: bool,
}

impl Default for ClaimRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimRecordBuilder {
    /// Creates a well-formed, unlabelled claim for the fixture policyholder
    pub fn new() -> Self {
        Self {
            id: IdFixtures::claim_id(),
            policyholder_id: IdFixtures::policyholder_id(),
            sessions_attended: json!(10),
            case_severity: json!(3),
            treatment_duration: json!("8 weeks"),
            total_amount_paid: json!(1500.0),
            reimbursement_class: None,
            reimbursement_amount: None,
            treatment_details: true,
            financial_info: true,
        }
    }

    pub fn with_id(mut self, id: ClaimId) -> Self {
        self.id = id;
        self
    }

    pub fn for_policyholder(mut self, id: PolicyholderId) -> Self {
        self.policyholder_id = id;
        self
    }

    pub fn with_sessions(mut self, sessions: impl Into<Value>) -> Self {
        self.sessions_attended = sessions.into();
        self
    }

    pub fn with_severity(mut self, severity: impl Into<Value>) -> Self {
        self.case_severity = severity.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<Value>) -> Self {
        self.treatment_duration = duration.into();
        self
    }

    pub fn with_total_paid(mut self, total: impl Into<Value>) -> Self {
        self.total_amount_paid = total.into();
        self
    }

    /// Sets the ground-truth label ("Low", "Medium", "High" or anything else)
    pub fn with_class(mut self, class: impl Into<Value>) -> Self {
        self.reimbursement_class = Some(class.into());
        self
    }

    pub fn with_reimbursed(mut self, amount: impl Into<Value>) -> Self {
        self.reimbursement_amount = Some(amount.into());
        self
    }

    pub fn without_treatment_details(mut self) -> Self {
        self.treatment_details = false;
        self
    }

    pub fn without_financial_info(mut self) -> Self {
        self.financial_info = false;
        self
    }

    /// The stored document form
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".into(), json!(self.id.as_uuid()));
        doc.insert("clientId".into(), json!(self.policyholder_id.as_uuid()));
        if self.treatment_details {
            doc.insert(
                "treatmentDetails".into(),
                json!({
                    "diagnosis": "Lumbar strain",
                    "sessionsAttended": self.sessions_attended,
                    "caseSeverity": self.case_severity,
                    "treatmentDuration": self.treatment_duration,
                    "treatmentType": "Physiotherapy",
                }),
            );
        }
        if self.financial_info {
            doc.insert(
                "financialInfo".into(),
                json!({ "totalAmountPaid": self.total_amount_paid }),
            );
        }
        if let Some(class) = &self.reimbursement_class {
            doc.insert("reimbursementClass".into(), class.clone());
        }
        if let Some(amount) = &self.reimbursement_amount {
            doc.insert("reimbursementAmount".into(), amount.clone());
        }
        Value::Object(doc)
    }

    pub fn build(self) -> ClaimRecord {
        serde_json::from_value(self.to_json()).expect("builder produces a valid claim document")
    }
}

/// Builder for policyholder (client) records
#[derive(Debug, Clone)]
pub struct PolicyholderRecordBuilder {
    id: PolicyholderId,
    birth_date: Value,
    conditions: Value,
    smoker: Value,
    exercise: Value,
    plan_min: Value,
    plan_max: Value,
    health: bool,
    plan: bool,
}

impl Default for PolicyholderRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyholderRecordBuilder {
    /// Creates a well-formed fixture policyholder
    pub fn new() -> Self {
        Self {
            id: IdFixtures::policyholder_id(),
            birth_date: json!("1990-06-15T00:00:00.000Z"),
            conditions: json!("asthma hypertension"),
            smoker: json!(false),
            exercise: json!("Sometimes"),
            plan_min: json!(40),
            plan_max: json!(80),
            health: true,
            plan: true,
        }
    }

    pub fn with_id(mut self, id: PolicyholderId) -> Self {
        self.id = id;
        self
    }

    pub fn with_birth_date(mut self, birth_date: impl Into<Value>) -> Self {
        self.birth_date = birth_date.into();
        self
    }

    pub fn with_conditions(mut self, conditions: impl Into<Value>) -> Self {
        self.conditions = conditions.into();
        self
    }

    pub fn with_smoker(mut self, smoker: impl Into<Value>) -> Self {
        self.smoker = smoker.into();
        self
    }

    pub fn with_exercise(mut self, exercise: impl Into<Value>) -> Self {
        self.exercise = exercise.into();
        self
    }

    /// Sets the plan range as integer percentages
    pub fn with_plan_range(mut self, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.plan_min = min.into();
        self.plan_max = max.into();
        self
    }

    pub fn without_health(mut self) -> Self {
        self.health = false;
        self
    }

    pub fn without_plan(mut self) -> Self {
        self.plan = false;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".into(), json!(self.id.as_uuid()));
        doc.insert("birthDate".into(), self.birth_date.clone());
        if self.health {
            doc.insert(
                "health".into(),
                json!({
                    "conditions": self.conditions,
                    "smoker": self.smoker,
                    "exercise": self.exercise,
                }),
            );
        }
        if self.plan {
            doc.insert(
                "plan".into(),
                json!({ "range": { "min": self.plan_min, "max": self.plan_max } }),
            );
        }
        Value::Object(doc)
    }

    pub fn build(self) -> PolicyholderRecord {
        serde_json::from_value(self.to_json()).expect("builder produces a valid policyholder document")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_builder_defaults() {
        let claim = ClaimRecordBuilder::new().build();
        assert!(claim.treatment_details.is_some());
        assert!(claim.financial_info.is_some());
        assert!(claim.reimbursement_class().is_none());
        assert_eq!(claim.policyholder_id, IdFixtures::policyholder_id());
    }

    #[test]
    fn test_claim_builder_omits_groups() {
        let claim = ClaimRecordBuilder::new()
            .without_treatment_details()
            .without_financial_info()
            .build();
        assert!(claim.treatment_details.is_none());
        assert!(claim.financial_info.is_none());
    }

    #[test]
    fn test_policyholder_builder_omits_groups() {
        let holder = PolicyholderRecordBuilder::new().without_health().without_plan().build();
        assert!(holder.health.is_none());
        assert!(holder.plan.is_none());
    }
}
