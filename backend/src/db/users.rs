use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::{DbContext, DbError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Caretaker,
    Tenant,
}

impl Role {
    /// Staff roles may use the management API.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Caretaker)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "caretaker" => Ok(Self::Caretaker),
            "tenant" => Ok(Self::Tenant),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub full_name: Option<String>,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, phone, full_name, is_active, created_at, updated_at";

pub async fn create_user(db: &DbContext, new_user: NewUser) -> Result<User, DbError> {
    let sql = format!(
        r"
        INSERT INTO users (username, email, password_hash, role, phone, full_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {USER_COLUMNS}
        "
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.role)
        .bind(new_user.phone)
        .bind(new_user.full_name)
        .fetch_one(db)
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(db: &DbContext, id: i64) -> Result<User, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql).bind(id).fetch_one(db).await?;
    Ok(user)
}

pub async fn get_user_by_name(db: &DbContext, username: &str) -> Result<User, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
    let user = sqlx::query_as::<_, User>(&sql).bind(username).fetch_one(db).await?;
    Ok(user)
}

pub async fn get_user_by_email(db: &DbContext, email: &str) -> Result<User, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let user = sqlx::query_as::<_, User>(&sql).bind(email).fetch_one(db).await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("caretaker".parse::<Role>(), Ok(Role::Caretaker));
        assert_eq!("super_admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert!("landlord".parse::<Role>().is_err());
        assert!(Role::Caretaker.is_staff());
        assert!(!Role::Tenant.is_staff());
    }
}
