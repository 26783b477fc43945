//! Job material allocation domain module.
//!
//! Binds materials to jobs with a point-in-time cost snapshot. Pure decision
//! logic; stock consumption is recorded by the engine through the stock
//! ledger so every balance change keeps its audit trail.

pub mod job_material;

pub use job_material::JobMaterial;
