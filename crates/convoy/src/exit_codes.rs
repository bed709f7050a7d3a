//! Exit codes for the CLI

use convoy_core::error::{ConvoyError, WorkflowError};

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Git error
pub const GIT_ERROR: i32 = 3;

/// Version error
pub const VERSION_ERROR: i32 = 4;

/// Validation error
pub const VALIDATION_ERROR: i32 = 5;

/// One or more packages failed to publish
pub const PUBLISH_ERROR: i32 = 6;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Map an error to the process exit code.
pub fn for_error(error: &anyhow::Error) -> i32 {
    let Some(convoy) = error.downcast_ref::<ConvoyError>() else {
        return ERROR;
    };

    match convoy {
        ConvoyError::Config(_) => CONFIG_ERROR,
        ConvoyError::Git(_) => GIT_ERROR,
        ConvoyError::Version(_) => VERSION_ERROR,
        ConvoyError::Graph(_) => VALIDATION_ERROR,
        ConvoyError::Workflow(WorkflowError::Cancelled) => CANCELLED,
        ConvoyError::Workflow(WorkflowError::PartialPublish { .. }) => PUBLISH_ERROR,
        // Failed lifecycle scripts surface the child process problem, not a
        // configuration mistake
        ConvoyError::Workflow(WorkflowError::HookFailed { .. }) => ERROR,
        ConvoyError::Workflow(_) => VALIDATION_ERROR,
        ConvoyError::Publish(_) => PUBLISH_ERROR,
        _ => ERROR,
    }
}
