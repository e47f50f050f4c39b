//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::{ClaimId, PolicyholderId, PortError};

#[test]
fn test_invalid_identifier_names_kind_and_input() {
    let error = ClaimId::parse("CLM-not-a-uuid").unwrap_err();

    match &error {
        CoreError::InvalidIdentifier { kind, input, .. } => {
            assert_eq!(*kind, "ClaimId");
            assert_eq!(input, "CLM-not-a-uuid");
        }
    }
    assert_eq!(error.to_string(), "'CLM-not-a-uuid' is not a valid ClaimId identifier");
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_invalid_identifier_reports_its_own_kind() {
    let error = PolicyholderId::parse("").unwrap_err();
    assert!(error.to_string().contains("PolicyholderId"));
}

#[test]
fn test_port_error_validation_field() {
    let error = PortError::validation_field("must not be empty", "claimId");

    match error {
        PortError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("claimId")),
        _ => panic!("Expected Validation error"),
    }
}
