//! Tool lifecycle domain module.
//!
//! Business rules for the per-tool state machine: personnel checkout and
//! checkin (`ToolAssignment`), maintenance scheduling (`ToolMaintenance`),
//! job-side assignment (`JobTool`), and retirement. Pure decision logic;
//! persistence and race-closing conditional writes live in the store layer.

pub mod assignment;
pub mod job_tool;
pub mod maintenance;
pub mod status;

pub use assignment::{AssignmentStatus, CheckoutRequest, ToolAssignment};
pub use job_tool::{JobTool, JobToolStatus};
pub use maintenance::{due_within, MaintenanceDue, MaintenanceStatus, ToolMaintenance};
pub use status::retire_target;
