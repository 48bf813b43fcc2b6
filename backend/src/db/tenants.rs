use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::SqliteExecutor;

use crate::core::{DbContext, DbError};

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub unit_number: String,
    pub expected_rent: f64,
    pub deposit_amount: f64,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Tenant {
    /// First letter of every part of the name, upper-cased ("Jane Wanjiru" -> "JW").
    #[must_use]
    pub fn initials(&self) -> String {
        self.full_name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTenant {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub unit_number: String,
    pub expected_rent: f64,
    #[serde(default)]
    pub deposit_amount: f64,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub notes: Option<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TenantUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_number: Option<String>,
    pub expected_rent: Option<f64>,
    pub deposit_amount: Option<f64>,
    pub lease_start_date: Option<NaiveDate>,
    pub lease_end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

const TENANT_COLUMNS: &str = "id, full_name, phone, email, unit_number, expected_rent, deposit_amount, \
    lease_start_date, lease_end_date, is_active, notes, created_at, updated_at";

pub async fn create_tenant(db: &DbContext, new_tenant: NewTenant) -> Result<Tenant, DbError> {
    let sql = format!(
        r"
        INSERT INTO tenants (full_name, phone, email, unit_number, expected_rent, deposit_amount,
                             lease_start_date, lease_end_date, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {TENANT_COLUMNS}
        "
    );
    let tenant = sqlx::query_as::<_, Tenant>(&sql)
        .bind(new_tenant.full_name)
        .bind(new_tenant.phone)
        .bind(new_tenant.email)
        .bind(new_tenant.unit_number)
        .bind(new_tenant.expected_rent)
        .bind(new_tenant.deposit_amount)
        .bind(new_tenant.lease_start_date)
        .bind(new_tenant.lease_end_date)
        .bind(new_tenant.notes)
        .fetch_one(db)
        .await?;
    Ok(tenant)
}

pub async fn get_tenant_by_id(db: &DbContext, id: i64) -> Result<Tenant, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?");
    let tenant = sqlx::query_as::<_, Tenant>(&sql).bind(id).fetch_one(db).await?;
    Ok(tenant)
}

/// Tenants with the given active flag, optionally filtered by a case-insensitive search
/// over name, phone, unit and email.
pub async fn list_tenants(db: &DbContext, is_active: bool, search: Option<&str>) -> Result<Vec<Tenant>, DbError> {
    let tenants = match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE is_active = ? ORDER BY id");
            sqlx::query_as::<_, Tenant>(&sql).bind(is_active).fetch_all(db).await?
        }
        Some(search) => {
            let pattern = format!("%{search}%");
            let sql = format!(
                r"
                SELECT {TENANT_COLUMNS} FROM tenants
                WHERE is_active = ?
                  AND (full_name LIKE ? OR phone LIKE ? OR unit_number LIKE ? OR email LIKE ?)
                ORDER BY id
                "
            );
            sqlx::query_as::<_, Tenant>(&sql)
                .bind(is_active)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(db)
                .await?
        }
    };
    Ok(tenants)
}

/// Active tenants in ascending id order; the candidate set for payment matching.
pub async fn list_active_tenants<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Tenant>, DbError> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE is_active = 1 ORDER BY id");
    let tenants = sqlx::query_as::<_, Tenant>(&sql).fetch_all(db).await?;
    Ok(tenants)
}

pub async fn update_tenant(db: &DbContext, id: i64, update: TenantUpdate) -> Result<Tenant, DbError> {
    let sql = format!(
        r"
        UPDATE tenants SET
            full_name = COALESCE(?, full_name),
            phone = COALESCE(?, phone),
            email = COALESCE(?, email),
            unit_number = COALESCE(?, unit_number),
            expected_rent = COALESCE(?, expected_rent),
            deposit_amount = COALESCE(?, deposit_amount),
            lease_start_date = COALESCE(?, lease_start_date),
            lease_end_date = COALESCE(?, lease_end_date),
            notes = COALESCE(?, notes),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {TENANT_COLUMNS}
        "
    );
    let tenant = sqlx::query_as::<_, Tenant>(&sql)
        .bind(update.full_name)
        .bind(update.phone)
        .bind(update.email)
        .bind(update.unit_number)
        .bind(update.expected_rent)
        .bind(update.deposit_amount)
        .bind(update.lease_start_date)
        .bind(update.lease_end_date)
        .bind(update.notes)
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(tenant)
}

/// Soft delete: payment history keeps pointing at the row.
pub async fn deactivate_tenant(db: &DbContext, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE tenants SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::RowNotFound);
    }
    Ok(())
}

/// Active tenants whose lease ends within `[from, to]`, soonest first.
pub async fn list_leases_ending_between(db: &DbContext, from: NaiveDate, to: NaiveDate) -> Result<Vec<Tenant>, DbError> {
    let sql = format!(
        r"
        SELECT {TENANT_COLUMNS} FROM tenants
        WHERE is_active = 1 AND lease_end_date >= ? AND lease_end_date <= ?
        ORDER BY lease_end_date, id
        "
    );
    let tenants = sqlx::query_as::<_, Tenant>(&sql).bind(from).bind(to).fetch_all(db).await?;
    Ok(tenants)
}
