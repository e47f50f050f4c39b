//! Source records as delivered by the claim-intake system
//!
//! Field names follow the stored documents (camelCase). Values the intake
//! system does not type reliably are kept as raw JSON and coerced during
//! extraction; nested groups are optional so that a missing group can be
//! reported instead of failing deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{ClaimId, PolicyholderId};

use crate::label::ReimbursementClass;

/// A medical-treatment bulletin requesting reimbursement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: ClaimId,
    /// Policyholder the claim was filed for
    #[serde(rename = "clientId", alias = "policyholderId")]
    pub policyholder_id: PolicyholderId,
    #[serde(default)]
    pub treatment_details: Option<TreatmentDetails>,
    #[serde(default)]
    pub financial_info: Option<FinancialInfo>,
    /// Ground-truth label, only present on training data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reimbursement_class: Option<Value>,
    /// Amount actually reimbursed, only present on training data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reimbursement_amount: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub sessions_attended: Value,
    #[serde(default)]
    pub case_severity: Value,
    /// "<value> <unit>", e.g. "8 weeks"
    #[serde(default)]
    pub treatment_duration: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInfo {
    #[serde(default)]
    pub total_amount_paid: Value,
}

impl ClaimRecord {
    /// Raw label string, if the label is present and textual
    pub fn class_label(&self) -> Option<&str> {
        self.reimbursement_class.as_ref().and_then(Value::as_str)
    }

    /// Parsed label; `None` when absent, `Some(Err)` when unrecognized
    pub fn reimbursement_class(&self) -> Option<Result<ReimbursementClass, String>> {
        match &self.reimbursement_class {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse()),
            Some(other) => Some(Err(format!("reimbursement class {} is not a string", other))),
        }
    }
}

/// The insured individual's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyholderRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: PolicyholderId,
    /// RFC 3339 timestamp, plain date, epoch millis or `{"$date": …}`
    #[serde(default)]
    pub birth_date: Value,
    #[serde(default)]
    pub health: Option<HealthInfo>,
    #[serde(default)]
    pub plan: Option<PlanInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    /// Free text or a list of conditions
    #[serde(default)]
    pub conditions: Value,
    #[serde(default)]
    pub smoker: Value,
    /// One of "Often", "Sometimes", "Never"
    #[serde(default)]
    pub exercise: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanInfo {
    #[serde(default)]
    pub range: Option<PlanRange>,
}

/// Reimbursement range of the plan, as integer percentages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRange {
    #[serde(default)]
    pub min: Value,
    #[serde(default)]
    pub max: Value,
}
