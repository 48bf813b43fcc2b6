use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::{DbContext, DbError};

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub theme: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub category: String,
    pub theme: String,
    pub content: String,
}

const TEMPLATE_COLUMNS: &str = "id, name, category, theme, content, is_active, created_at, updated_at";

pub async fn create_template(db: &DbContext, new_template: NewTemplate) -> Result<Template, DbError> {
    let sql = format!(
        r"
        INSERT INTO templates (name, category, theme, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {TEMPLATE_COLUMNS}
        "
    );
    let template = sqlx::query_as::<_, Template>(&sql)
        .bind(new_template.name)
        .bind(new_template.category)
        .bind(new_template.theme)
        .bind(new_template.content)
        .fetch_one(db)
        .await?;
    Ok(template)
}

pub async fn get_template_by_id(db: &DbContext, id: i64) -> Result<Template, DbError> {
    let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?");
    let template = sqlx::query_as::<_, Template>(&sql).bind(id).fetch_one(db).await?;
    Ok(template)
}

/// Active templates, optionally narrowed to a category and/or theme.
pub async fn list_active_templates(
    db: &DbContext,
    category: Option<&str>,
    theme: Option<&str>,
) -> Result<Vec<Template>, DbError> {
    let sql = format!(
        r"
        SELECT {TEMPLATE_COLUMNS} FROM templates
        WHERE is_active = 1
          AND (? IS NULL OR category = ?)
          AND (? IS NULL OR theme = ?)
        ORDER BY id
        "
    );
    let templates = sqlx::query_as::<_, Template>(&sql)
        .bind(category)
        .bind(category)
        .bind(theme)
        .bind(theme)
        .fetch_all(db)
        .await?;
    Ok(templates)
}

/// First active template of a category (and theme, when given), if any.
pub async fn find_active_template(
    db: &DbContext,
    category: &str,
    theme: Option<&str>,
) -> Result<Option<Template>, DbError> {
    Ok(list_active_templates(db, Some(category), theme).await?.into_iter().next())
}

pub async fn count_templates(db: &DbContext) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM templates").fetch_one(db).await?;
    Ok(count)
}
