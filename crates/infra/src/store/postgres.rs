//! Postgres-backed ledger store implementation.
//!
//! Persists all six row families in PostgreSQL with the uniqueness and
//! concurrency invariants enforced at the database level.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE materials (
//!     id UUID PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     description TEXT,
//!     category TEXT NOT NULL,
//!     sku TEXT,
//!     unit_cost BIGINT NOT NULL,
//!     current_stock BIGINT NOT NULL CHECK (current_stock >= 0),
//!     min_stock BIGINT NOT NULL,
//!     reorder_point BIGINT NOT NULL,
//!     is_active BOOLEAN NOT NULL,
//!     is_tool BOOLEAN NOT NULL,
//!     tool_status TEXT,
//!     next_maintenance_date DATE,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL,
//!     version BIGINT NOT NULL
//! );
//!
//! CREATE TABLE material_transactions (
//!     id UUID PRIMARY KEY,
//!     material_id UUID NOT NULL REFERENCES materials (id),
//!     transaction_type TEXT NOT NULL,
//!     quantity BIGINT NOT NULL,
//!     unit_cost BIGINT,
//!     total_cost BIGINT,
//!     previous_stock BIGINT NOT NULL,
//!     new_stock BIGINT NOT NULL,
//!     notes TEXT,
//!     created_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE tool_assignments (
//!     id UUID PRIMARY KEY,
//!     material_id UUID NOT NULL REFERENCES materials (id),
//!     assigned_to_name TEXT NOT NULL,
//!     assigned_date TIMESTAMPTZ NOT NULL,
//!     expected_return_date TIMESTAMPTZ,
//!     actual_return_date TIMESTAMPTZ,
//!     job_id UUID,
//!     status TEXT NOT NULL,
//!     condition_at_assignment TEXT,
//!     condition_at_return TEXT,
//!     notes TEXT
//! );
//! -- at most one active assignment per material
//! CREATE UNIQUE INDEX uq_tool_assignments_active
//!     ON tool_assignments (material_id) WHERE status = 'active';
//!
//! CREATE TABLE job_materials (
//!     id UUID PRIMARY KEY,
//!     job_id UUID NOT NULL,
//!     material_id UUID NOT NULL REFERENCES materials (id),
//!     quantity_used BIGINT NOT NULL,
//!     unit_cost BIGINT NOT NULL,
//!     total_cost BIGINT NOT NULL,
//!     notes TEXT,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     UNIQUE (job_id, material_id)
//! );
//!
//! CREATE TABLE tool_maintenance (
//!     id UUID PRIMARY KEY,
//!     material_id UUID NOT NULL REFERENCES materials (id),
//!     scheduled_date DATE NOT NULL,
//!     completed_date DATE,
//!     status TEXT NOT NULL,
//!     cost BIGINT,
//!     notes TEXT,
//!     created_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE job_tools (
//!     id UUID PRIMARY KEY,
//!     job_id UUID NOT NULL,
//!     material_id UUID NOT NULL REFERENCES materials (id),
//!     assigned_by_name TEXT,
//!     assigned_date TIMESTAMPTZ NOT NULL,
//!     returned_date TIMESTAMPTZ,
//!     status TEXT NOT NULL
//! );
//! -- at most one assigned job tool per (job, material)
//! CREATE UNIQUE INDEX uq_job_tools_assigned
//!     ON job_tools (job_id, material_id) WHERE status = 'assigned';
//! ```
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | active-assignment / allocation uniqueness |
//! | Database (fk/check violation) | `23503`/`23514` | `InvalidWrite` | referential integrity, negative stock |
//! | PoolTimedOut / Io | n/a | `Unavailable` | transient connectivity; retry reads only |
//! | anything else | any | `Backend` | non-transient failure |
//!
//! ## Sync bridge
//!
//! The `LedgerStore` trait is synchronous; the sqlx operations are async.
//! The trait impl bridges via `tokio::task::block_in_place` plus
//! `Handle::block_on`, which is safe from async contexts such as axum
//! handlers. A multi-thread tokio runtime is required; a current-thread
//! runtime (or no runtime) yields `StoreError::Backend` instead of a panic.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use fieldstock_allocation::JobMaterial;
use fieldstock_core::{
    AssignmentId, ExpectedVersion, JobId, JobMaterialId, JobToolId, MaintenanceId, MaterialId,
};
use fieldstock_inventory::{Material, MaterialTransaction, ToolStatus, TransactionType};
use fieldstock_tools::{
    AssignmentStatus, JobTool, JobToolStatus, MaintenanceStatus, ToolAssignment, ToolMaintenance,
};

use super::r#trait::{LedgerStore, StoreError};

/// Postgres-backed ledger store.
///
/// Thread-safe through the sqlx connection pool. Composite operations run in
/// one database transaction; the partial unique indexes back the active
/// assignment and job tool invariants even against writers that bypass the
/// status-flag gate.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StoreError::Duplicate(format!("{op}: {}", db.message())),
            Some("23503") | Some("23514") => StoreError::InvalidWrite(format!("{op}: {}", db.message())),
            _ => StoreError::Backend(format!("{op}: {}", db.message())),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{op}: {e}"))
        }
        _ => StoreError::Backend(format!("{op}: {e}")),
    }
}

fn block_on<F: std::future::Future>(fut: F) -> Result<F::Output, StoreError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Backend(
            "PostgresLedgerStore requires an async runtime (tokio); call from within a runtime context"
                .to_string(),
        )
    })?;
    // Handle::block_on panics when invoked directly from an async execution
    // context, so drop to a blocking section first. block_in_place itself
    // panics on a current-thread runtime; reject that flavor up front.
    if matches!(
        handle.runtime_flavor(),
        tokio::runtime::RuntimeFlavor::CurrentThread
    ) {
        return Err(StoreError::Backend(
            "PostgresLedgerStore requires a multi-thread tokio runtime".to_string(),
        ));
    }
    Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
}

fn non_negative(op: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Backend(format!("{op}: negative value in row")))
}

fn tool_status_as_str(status: ToolStatus) -> &'static str {
    match status {
        ToolStatus::Available => "available",
        ToolStatus::Assigned => "assigned",
        ToolStatus::Maintenance => "maintenance",
        ToolStatus::Retired => "retired",
    }
}

fn tool_status_from_str(s: &str) -> Result<ToolStatus, StoreError> {
    match s {
        "available" => Ok(ToolStatus::Available),
        "assigned" => Ok(ToolStatus::Assigned),
        "maintenance" => Ok(ToolStatus::Maintenance),
        "retired" => Ok(ToolStatus::Retired),
        other => Err(StoreError::Backend(format!("unknown tool_status '{other}'"))),
    }
}

fn transaction_type_from_str(s: &str) -> Result<TransactionType, StoreError> {
    match s {
        "purchase" => Ok(TransactionType::Purchase),
        "usage" => Ok(TransactionType::Usage),
        "return" => Ok(TransactionType::Return),
        "adjustment" => Ok(TransactionType::Adjustment),
        other => Err(StoreError::Backend(format!("unknown transaction_type '{other}'"))),
    }
}

fn assignment_status_as_str(status: AssignmentStatus) -> &'static str {
    match status {
        AssignmentStatus::Active => "active",
        AssignmentStatus::Returned => "returned",
    }
}

fn assignment_status_from_str(s: &str) -> Result<AssignmentStatus, StoreError> {
    match s {
        "active" => Ok(AssignmentStatus::Active),
        "returned" => Ok(AssignmentStatus::Returned),
        other => Err(StoreError::Backend(format!("unknown assignment status '{other}'"))),
    }
}

fn maintenance_status_as_str(status: MaintenanceStatus) -> &'static str {
    match status {
        MaintenanceStatus::Scheduled => "scheduled",
        MaintenanceStatus::InProgress => "in_progress",
        MaintenanceStatus::Completed => "completed",
        MaintenanceStatus::Canceled => "canceled",
    }
}

fn maintenance_status_from_str(s: &str) -> Result<MaintenanceStatus, StoreError> {
    match s {
        "scheduled" => Ok(MaintenanceStatus::Scheduled),
        "in_progress" => Ok(MaintenanceStatus::InProgress),
        "completed" => Ok(MaintenanceStatus::Completed),
        "canceled" => Ok(MaintenanceStatus::Canceled),
        other => Err(StoreError::Backend(format!("unknown maintenance status '{other}'"))),
    }
}

fn job_tool_status_as_str(status: JobToolStatus) -> &'static str {
    match status {
        JobToolStatus::Assigned => "assigned",
        JobToolStatus::Returned => "returned",
    }
}

fn job_tool_status_from_str(s: &str) -> Result<JobToolStatus, StoreError> {
    match s {
        "assigned" => Ok(JobToolStatus::Assigned),
        "returned" => Ok(JobToolStatus::Returned),
        other => Err(StoreError::Backend(format!("unknown job tool status '{other}'"))),
    }
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    sku: Option<String>,
    unit_cost: i64,
    current_stock: i64,
    min_stock: i64,
    reorder_point: i64,
    is_active: bool,
    is_tool: bool,
    tool_status: Option<String>,
    next_maintenance_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<MaterialRow> for Material {
    type Error = StoreError;

    fn try_from(row: MaterialRow) -> Result<Self, Self::Error> {
        Ok(Material {
            id: MaterialId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            sku: row.sku,
            unit_cost: non_negative("materials.unit_cost", row.unit_cost)?,
            current_stock: row.current_stock,
            min_stock: row.min_stock,
            reorder_point: row.reorder_point,
            is_active: row.is_active,
            is_tool: row.is_tool,
            tool_status: row
                .tool_status
                .as_deref()
                .map(tool_status_from_str)
                .transpose()?,
            next_maintenance_date: row.next_maintenance_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: non_negative("materials.version", row.version)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    material_id: Uuid,
    transaction_type: String,
    quantity: i64,
    unit_cost: Option<i64>,
    total_cost: Option<i64>,
    previous_stock: i64,
    new_stock: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for MaterialTransaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(MaterialTransaction {
            id: fieldstock_core::TransactionId::from_uuid(row.id),
            material_id: MaterialId::from_uuid(row.material_id),
            transaction_type: transaction_type_from_str(&row.transaction_type)?,
            quantity: row.quantity,
            unit_cost: row
                .unit_cost
                .map(|v| non_negative("material_transactions.unit_cost", v))
                .transpose()?,
            total_cost: row
                .total_cost
                .map(|v| non_negative("material_transactions.total_cost", v))
                .transpose()?,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    material_id: Uuid,
    assigned_to_name: String,
    assigned_date: DateTime<Utc>,
    expected_return_date: Option<DateTime<Utc>>,
    actual_return_date: Option<DateTime<Utc>>,
    job_id: Option<Uuid>,
    status: String,
    condition_at_assignment: Option<String>,
    condition_at_return: Option<String>,
    notes: Option<String>,
}

impl TryFrom<AssignmentRow> for ToolAssignment {
    type Error = StoreError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(ToolAssignment {
            id: AssignmentId::from_uuid(row.id),
            material_id: MaterialId::from_uuid(row.material_id),
            assigned_to_name: row.assigned_to_name,
            assigned_date: row.assigned_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            job_id: row.job_id.map(JobId::from_uuid),
            status: assignment_status_from_str(&row.status)?,
            condition_at_assignment: row.condition_at_assignment,
            condition_at_return: row.condition_at_return,
            notes: row.notes,
        })
    }
}

#[derive(Debug, FromRow)]
struct JobMaterialRow {
    id: Uuid,
    job_id: Uuid,
    material_id: Uuid,
    quantity_used: i64,
    unit_cost: i64,
    total_cost: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobMaterialRow> for JobMaterial {
    type Error = StoreError;

    fn try_from(row: JobMaterialRow) -> Result<Self, Self::Error> {
        Ok(JobMaterial {
            id: JobMaterialId::from_uuid(row.id),
            job_id: JobId::from_uuid(row.job_id),
            material_id: MaterialId::from_uuid(row.material_id),
            quantity_used: row.quantity_used,
            unit_cost: non_negative("job_materials.unit_cost", row.unit_cost)?,
            total_cost: non_negative("job_materials.total_cost", row.total_cost)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MaintenanceRow {
    id: Uuid,
    material_id: Uuid,
    scheduled_date: NaiveDate,
    completed_date: Option<NaiveDate>,
    status: String,
    cost: Option<i64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MaintenanceRow> for ToolMaintenance {
    type Error = StoreError;

    fn try_from(row: MaintenanceRow) -> Result<Self, Self::Error> {
        Ok(ToolMaintenance {
            id: MaintenanceId::from_uuid(row.id),
            material_id: MaterialId::from_uuid(row.material_id),
            scheduled_date: row.scheduled_date,
            completed_date: row.completed_date,
            status: maintenance_status_from_str(&row.status)?,
            cost: row
                .cost
                .map(|v| non_negative("tool_maintenance.cost", v))
                .transpose()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct JobToolRow {
    id: Uuid,
    job_id: Uuid,
    material_id: Uuid,
    assigned_by_name: Option<String>,
    assigned_date: DateTime<Utc>,
    returned_date: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<JobToolRow> for JobTool {
    type Error = StoreError;

    fn try_from(row: JobToolRow) -> Result<Self, Self::Error> {
        Ok(JobTool {
            id: JobToolId::from_uuid(row.id),
            job_id: JobId::from_uuid(row.job_id),
            material_id: MaterialId::from_uuid(row.material_id),
            assigned_by_name: row.assigned_by_name,
            assigned_date: row.assigned_date,
            returned_date: row.returned_date,
            status: job_tool_status_from_str(&row.status)?,
        })
    }
}

fn rows_into<R, T>(rows: Vec<PgRow>, op: &str) -> Result<Vec<T>, StoreError>
where
    R: for<'r> FromRow<'r, PgRow>,
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter()
        .map(|row| {
            let decoded = R::from_row(&row)
                .map_err(|e| StoreError::Backend(format!("{op}: failed to decode row: {e}")))?;
            T::try_from(decoded)
        })
        .collect()
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Conditional material write inside an open transaction. On success the
    /// returned material carries the bumped version.
    async fn update_material_tx(
        tx: &mut Transaction<'_, Postgres>,
        mut material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE materials SET
                name = $2,
                description = $3,
                category = $4,
                sku = $5,
                unit_cost = $6,
                current_stock = $7,
                min_stock = $8,
                reorder_point = $9,
                is_active = $10,
                is_tool = $11,
                tool_status = $12,
                next_maintenance_date = $13,
                updated_at = $14,
                version = version + 1
            WHERE id = $1 AND ($15::BIGINT IS NULL OR version = $15)
            RETURNING version
            "#,
        )
        .bind(material.id.as_uuid())
        .bind(&material.name)
        .bind(&material.description)
        .bind(&material.category)
        .bind(&material.sku)
        .bind(material.unit_cost as i64)
        .bind(material.current_stock)
        .bind(material.min_stock)
        .bind(material.reorder_point)
        .bind(material.is_active)
        .bind(material.is_tool)
        .bind(material.tool_status.map(tool_status_as_str))
        .bind(material.next_maintenance_date)
        .bind(material.updated_at)
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_material", e))?;

        match updated {
            Some((version,)) => {
                material.version = non_negative("materials.version", version)?;
                Ok(material)
            }
            None => {
                // Distinguish "row missing" from "stale version".
                let current: Option<(i64,)> =
                    sqlx::query_as("SELECT version FROM materials WHERE id = $1")
                        .bind(material.id.as_uuid())
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(|e| map_sqlx_error("update_material", e))?;
                match current {
                    Some((found,)) => Err(StoreError::Concurrency(format!(
                        "material {}: expected {expected:?}, found {found}",
                        material.id
                    ))),
                    None => Err(StoreError::NotFound(format!("material {}", material.id))),
                }
            }
        }
    }

    async fn insert_transaction_tx(
        tx: &mut Transaction<'_, Postgres>,
        transaction: &MaterialTransaction,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO material_transactions (
                id, material_id, transaction_type, quantity, unit_cost,
                total_cost, previous_stock, new_stock, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.material_id.as_uuid())
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.quantity)
        .bind(transaction.unit_cost.map(|v| v as i64))
        .bind(transaction.total_cost.map(|v| v as i64))
        .bind(transaction.previous_stock)
        .bind(transaction.new_stock)
        .bind(&transaction.notes)
        .bind(transaction.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;
        Ok(())
    }

    async fn upsert_assignment_tx(
        tx: &mut Transaction<'_, Postgres>,
        assignment: &ToolAssignment,
        insert: bool,
    ) -> Result<(), StoreError> {
        if insert {
            sqlx::query(
                r#"
                INSERT INTO tool_assignments (
                    id, material_id, assigned_to_name, assigned_date,
                    expected_return_date, actual_return_date, job_id, status,
                    condition_at_assignment, condition_at_return, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(assignment.id.as_uuid())
            .bind(assignment.material_id.as_uuid())
            .bind(&assignment.assigned_to_name)
            .bind(assignment.assigned_date)
            .bind(assignment.expected_return_date)
            .bind(assignment.actual_return_date)
            .bind(assignment.job_id.map(|j| *j.as_uuid()))
            .bind(assignment_status_as_str(assignment.status))
            .bind(&assignment.condition_at_assignment)
            .bind(&assignment.condition_at_return)
            .bind(&assignment.notes)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_assignment", e))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE tool_assignments SET
                    actual_return_date = $2,
                    status = $3,
                    condition_at_return = $4,
                    notes = $5
                WHERE id = $1
                "#,
            )
            .bind(assignment.id.as_uuid())
            .bind(assignment.actual_return_date)
            .bind(assignment_status_as_str(assignment.status))
            .bind(&assignment.condition_at_return)
            .bind(&assignment.notes)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_assignment", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("assignment {}", assignment.id)));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, material, seed), fields(material_id = %material.id), err)]
    async fn insert_material(
        &self,
        material: Material,
        seed: Option<MaterialTransaction>,
    ) -> Result<Material, StoreError> {
        if let Some(seed) = &seed {
            if seed.material_id != material.id {
                return Err(StoreError::InvalidWrite(
                    "seed transaction references a different material".to_string(),
                ));
            }
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_material", e))?;

        sqlx::query(
            r#"
            INSERT INTO materials (
                id, name, description, category, sku, unit_cost, current_stock,
                min_stock, reorder_point, is_active, is_tool, tool_status,
                next_maintenance_date, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(material.id.as_uuid())
        .bind(&material.name)
        .bind(&material.description)
        .bind(&material.category)
        .bind(&material.sku)
        .bind(material.unit_cost as i64)
        .bind(material.current_stock)
        .bind(material.min_stock)
        .bind(material.reorder_point)
        .bind(material.is_active)
        .bind(material.is_tool)
        .bind(material.tool_status.map(tool_status_as_str))
        .bind(material.next_maintenance_date)
        .bind(material.created_at)
        .bind(material.updated_at)
        .bind(material.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_material", e))?;

        if let Some(seed) = &seed {
            Self::insert_transaction_tx(&mut tx, seed).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_material", e))?;
        Ok(material)
    }

    async fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        let row: Option<MaterialRow> = sqlx::query_as("SELECT * FROM materials WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("material", e))?;
        row.map(Material::try_from).transpose()
    }

    async fn materials(&self) -> Result<Vec<Material>, StoreError> {
        let rows = sqlx::query("SELECT * FROM materials ORDER BY name ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("materials", e))?;
        rows_into::<MaterialRow, Material>(rows, "materials")
    }

    async fn update_material(
        &self,
        material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_material", e))?;
        let material = Self::update_material_tx(&mut tx, material, expected).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_material", e))?;
        Ok(material)
    }

    #[instrument(skip(self, material, transaction), fields(material_id = %material.id), err)]
    async fn commit_stock_change(
        &self,
        material: Material,
        expected: ExpectedVersion,
        transaction: MaterialTransaction,
    ) -> Result<(Material, MaterialTransaction), StoreError> {
        if transaction.material_id != material.id {
            return Err(StoreError::InvalidWrite(
                "transaction references a different material".to_string(),
            ));
        }
        if transaction.new_stock != material.current_stock {
            return Err(StoreError::InvalidWrite(format!(
                "transaction new_stock {} disagrees with balance {}",
                transaction.new_stock, material.current_stock
            )));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_stock_change", e))?;
        let material = Self::update_material_tx(&mut tx, material, expected).await?;
        Self::insert_transaction_tx(&mut tx, &transaction).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_stock_change", e))?;
        Ok((material, transaction))
    }

    async fn transactions(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<MaterialTransaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM material_transactions
            WHERE material_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(material_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions", e))?;
        rows_into::<TransactionRow, MaterialTransaction>(rows, "transactions")
    }

    #[instrument(skip(self, material, assignment), fields(material_id = %material.id), err)]
    async fn commit_checkout(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        if assignment.material_id != material.id {
            return Err(StoreError::InvalidWrite(
                "assignment references a different material".to_string(),
            ));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_checkout", e))?;
        let material = Self::update_material_tx(&mut tx, material, expected).await?;
        Self::upsert_assignment_tx(&mut tx, &assignment, true).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_checkout", e))?;
        Ok((material, assignment))
    }

    async fn commit_checkin(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_checkin", e))?;
        let material = Self::update_material_tx(&mut tx, material, expected).await?;
        Self::upsert_assignment_tx(&mut tx, &assignment, false).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_checkin", e))?;
        Ok((material, assignment))
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError> {
        let row: Option<AssignmentRow> =
            sqlx::query_as("SELECT * FROM tool_assignments WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("assignment", e))?;
        row.map(ToolAssignment::try_from).transpose()
    }

    async fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tool_assignments WHERE status = 'active'")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("active_assignments", e))?;
        rows_into::<AssignmentRow, ToolAssignment>(rows, "active_assignments")
    }

    async fn assignments_for_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<ToolAssignment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tool_assignments
            WHERE material_id = $1
            ORDER BY assigned_date DESC
            "#,
        )
        .bind(material_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assignments_for_material", e))?;
        rows_into::<AssignmentRow, ToolAssignment>(rows, "assignments_for_material")
    }

    async fn insert_job_material(
        &self,
        job_material: JobMaterial,
    ) -> Result<JobMaterial, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_materials (
                id, job_id, material_id, quantity_used, unit_cost, total_cost,
                notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job_material.id.as_uuid())
        .bind(job_material.job_id.as_uuid())
        .bind(job_material.material_id.as_uuid())
        .bind(job_material.quantity_used)
        .bind(job_material.unit_cost as i64)
        .bind(job_material.total_cost as i64)
        .bind(&job_material.notes)
        .bind(job_material.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_job_material", e))?;
        Ok(job_material)
    }

    async fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError> {
        let row: Option<JobMaterialRow> =
            sqlx::query_as("SELECT * FROM job_materials WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("job_material", e))?;
        row.map(JobMaterial::try_from).transpose()
    }

    async fn find_job_material(
        &self,
        job_id: JobId,
        material_id: MaterialId,
    ) -> Result<Option<JobMaterial>, StoreError> {
        let row: Option<JobMaterialRow> = sqlx::query_as(
            "SELECT * FROM job_materials WHERE job_id = $1 AND material_id = $2",
        )
        .bind(job_id.as_uuid())
        .bind(material_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_job_material", e))?;
        row.map(JobMaterial::try_from).transpose()
    }

    async fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM job_materials
            WHERE job_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("job_materials_for_job", e))?;
        rows_into::<JobMaterialRow, JobMaterial>(rows, "job_materials_for_job")
    }

    async fn update_job_material(
        &self,
        job_material: JobMaterial,
    ) -> Result<JobMaterial, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE job_materials SET
                quantity_used = $2,
                total_cost = $3,
                notes = $4
            WHERE id = $1
            "#,
        )
        .bind(job_material.id.as_uuid())
        .bind(job_material.quantity_used)
        .bind(job_material.total_cost as i64)
        .bind(&job_material.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_job_material", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("job material {}", job_material.id)));
        }
        Ok(job_material)
    }

    async fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM job_materials WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_job_material", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("job material {id}")));
        }
        Ok(())
    }

    async fn insert_maintenance(
        &self,
        event: ToolMaintenance,
    ) -> Result<ToolMaintenance, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tool_maintenance (
                id, material_id, scheduled_date, completed_date, status, cost,
                notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.material_id.as_uuid())
        .bind(event.scheduled_date)
        .bind(event.completed_date)
        .bind(maintenance_status_as_str(event.status))
        .bind(event.cost.map(|v| v as i64))
        .bind(&event.notes)
        .bind(event.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_maintenance", e))?;
        Ok(event)
    }

    async fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError> {
        let row: Option<MaintenanceRow> =
            sqlx::query_as("SELECT * FROM tool_maintenance WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("maintenance", e))?;
        row.map(ToolMaintenance::try_from).transpose()
    }

    async fn update_maintenance(
        &self,
        event: ToolMaintenance,
    ) -> Result<ToolMaintenance, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tool_maintenance SET
                completed_date = $2,
                status = $3,
                cost = $4,
                notes = $5
            WHERE id = $1
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.completed_date)
        .bind(maintenance_status_as_str(event.status))
        .bind(event.cost.map(|v| v as i64))
        .bind(&event.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_maintenance", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("maintenance {}", event.id)));
        }
        Ok(event)
    }

    async fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_tools (
                id, job_id, material_id, assigned_by_name, assigned_date,
                returned_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job_tool.id.as_uuid())
        .bind(job_tool.job_id.as_uuid())
        .bind(job_tool.material_id.as_uuid())
        .bind(&job_tool.assigned_by_name)
        .bind(job_tool.assigned_date)
        .bind(job_tool.returned_date)
        .bind(job_tool_status_as_str(job_tool.status))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_job_tool", e))?;
        Ok(job_tool)
    }

    async fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError> {
        let row: Option<JobToolRow> = sqlx::query_as("SELECT * FROM job_tools WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("job_tool", e))?;
        row.map(JobTool::try_from).transpose()
    }

    async fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE job_tools SET
                returned_date = $2,
                status = $3
            WHERE id = $1
            "#,
        )
        .bind(job_tool.id.as_uuid())
        .bind(job_tool.returned_date)
        .bind(job_tool_status_as_str(job_tool.status))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_job_tool", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("job tool {}", job_tool.id)));
        }
        Ok(job_tool)
    }

    async fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM job_tools
            WHERE job_id = $1
            ORDER BY assigned_date DESC
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("job_tools_for_job", e))?;
        rows_into::<JobToolRow, JobTool>(rows, "job_tools_for_job")
    }
}

impl LedgerStore for PostgresLedgerStore {
    fn insert_material(
        &self,
        material: Material,
        seed: Option<MaterialTransaction>,
    ) -> Result<Material, StoreError> {
        block_on(self.insert_material(material, seed))?
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        block_on(self.material(id))?
    }

    fn materials(&self) -> Result<Vec<Material>, StoreError> {
        block_on(self.materials())?
    }

    fn update_material(
        &self,
        material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        block_on(self.update_material(material, expected))?
    }

    fn commit_stock_change(
        &self,
        material: Material,
        expected: ExpectedVersion,
        transaction: MaterialTransaction,
    ) -> Result<(Material, MaterialTransaction), StoreError> {
        block_on(self.commit_stock_change(material, expected, transaction))?
    }

    fn transactions(&self, material_id: MaterialId) -> Result<Vec<MaterialTransaction>, StoreError> {
        block_on(self.transactions(material_id))?
    }

    fn commit_checkout(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        block_on(self.commit_checkout(material, expected, assignment))?
    }

    fn commit_checkin(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        block_on(self.commit_checkin(material, expected, assignment))?
    }

    fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError> {
        block_on(self.assignment(id))?
    }

    fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError> {
        block_on(self.active_assignments())?
    }

    fn assignments_for_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<ToolAssignment>, StoreError> {
        block_on(self.assignments_for_material(material_id))?
    }

    fn insert_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        block_on(self.insert_job_material(job_material))?
    }

    fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError> {
        block_on(self.job_material(id))?
    }

    fn find_job_material(
        &self,
        job_id: JobId,
        material_id: MaterialId,
    ) -> Result<Option<JobMaterial>, StoreError> {
        block_on(self.find_job_material(job_id, material_id))?
    }

    fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError> {
        block_on(self.job_materials_for_job(job_id))?
    }

    fn update_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        block_on(self.update_job_material(job_material))?
    }

    fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError> {
        block_on(self.delete_job_material(id))?
    }

    fn insert_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        block_on(self.insert_maintenance(event))?
    }

    fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError> {
        block_on(self.maintenance(id))?
    }

    fn update_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        block_on(self.update_maintenance(event))?
    }

    fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        block_on(self.insert_job_tool(job_tool))?
    }

    fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError> {
        block_on(self.job_tool(id))?
    }

    fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        block_on(self.update_job_tool(job_tool))?
    }

    fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError> {
        block_on(self.job_tools_for_job(job_id))?
    }
}
