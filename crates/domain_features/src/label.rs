//! Reimbursement severity classes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three reimbursement classes, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReimbursementClass {
    Low,
    Medium,
    High,
}

impl ReimbursementClass {
    pub const COUNT: usize = 3;

    pub const ALL: [ReimbursementClass; 3] = [
        ReimbursementClass::Low,
        ReimbursementClass::Medium,
        ReimbursementClass::High,
    ];

    /// Maps a classifier output index to its class
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            ReimbursementClass::Low => 0,
            ReimbursementClass::Medium => 1,
            ReimbursementClass::High => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReimbursementClass::Low => "Low",
            ReimbursementClass::Medium => "Medium",
            ReimbursementClass::High => "High",
        }
    }
}

impl fmt::Display for ReimbursementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label strings are matched exactly, as stored by the labelling workflow
impl FromStr for ReimbursementClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(ReimbursementClass::Low),
            "Medium" => Ok(ReimbursementClass::Medium),
            "High" => Ok(ReimbursementClass::High),
            other => Err(format!("unrecognized reimbursement class '{}'", other)),
        }
    }
}
