use crate::core::{DbContext, DbError};
use crate::db::{self, NewTemplate};

/// (name, category, theme, content)
const DEFAULT_TEMPLATES: [(&str, &str, &str, &str); 6] = [
    (
        "Rent Reminder",
        "reminder",
        "friendly",
        "Hi {tenant_name}, this is a friendly reminder that your rent of KES {amount} for unit {unit_number} is due. Thank you!",
    ),
    (
        "Payment Received",
        "receipt",
        "formal",
        "Dear {tenant_name}, we confirm receipt of your payment of KES {amount} for unit {unit_number} on {payment_date}. \
         Reference: {transaction_reference}. Remaining balance: KES {remaining_amount}. Thank you.",
    ),
    (
        "Late Payment Notice",
        "reminder",
        "formal",
        "Dear {tenant_name}, your rent payment for unit {unit_number} is overdue. Please settle the outstanding amount of \
         KES {remaining_amount} at your earliest convenience.",
    ),
    (
        "Lease Renewal Reminder",
        "lease",
        "friendly",
        "Hello {tenant_name}! Your lease for unit {unit_number} is ending soon. Please contact us to discuss renewal options. \
         We appreciate having you as our tenant!",
    ),
    (
        "Maintenance Notice",
        "maintenance",
        "formal",
        "Dear {tenant_name}, scheduled maintenance will be conducted in unit {unit_number} on {maintenance_date}. \
         We apologize for any inconvenience.",
    ),
    (
        "Welcome Message",
        "general",
        "friendly",
        "Welcome {tenant_name}! We are excited to have you in unit {unit_number}. If you need anything, feel free to reach out. \
         Happy renting!",
    ),
];

/// Inserts the default templates into an empty table. Returns how many were created.
pub async fn seed_default_templates(db: &DbContext) -> Result<usize, DbError> {
    let existing = db::count_templates(db).await?;
    if existing > 0 {
        tracing::info!(existing, "Templates already present, skipping seed");
        return Ok(0);
    }

    for (name, category, theme, content) in DEFAULT_TEMPLATES {
        db::create_template(db, NewTemplate {
            name: name.to_string(),
            category: category.to_string(),
            theme: theme.to_string(),
            content: content.to_string(),
        })
        .await?;
    }
    tracing::info!(count = DEFAULT_TEMPLATES.len(), "Seeded default message templates");
    Ok(DEFAULT_TEMPLATES.len())
}
