//! Shared tool status transitions.

use fieldstock_core::{DomainError, DomainResult};
use fieldstock_inventory::{Material, ToolStatus};

/// Decide a retirement: reachable from any state, terminal once reached.
pub fn retire_target(material: &Material) -> DomainResult<ToolStatus> {
    let status = material.require_tool_status()?;
    if status == ToolStatus::Retired {
        return Err(DomainError::invalid_operation(format!(
            "tool '{}' is already retired",
            material.name
        )));
    }
    Ok(ToolStatus::Retired)
}
