use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::core::{DbContext, DbError};
use crate::db::{self, Payment, Template, Tenant};
use crate::services::sms::SmsSender;

const RECEIPT_CATEGORY: &str = "receipt";
const RECEIPT_THEME: &str = "formal";
const REMINDER_CATEGORY: &str = "reminder";

/// Values substituted for `{name}` placeholders in a template.
#[derive(Clone, Debug, Default)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Display) {
        self.0.insert(name.into(), value.to_string());
    }

    /// Standard placeholders available to every tenant message.
    #[must_use]
    pub fn for_tenant(tenant: &Tenant) -> Self {
        Self::new().with("tenant_name", &tenant.full_name).with("unit_number", &tenant.unit_number)
    }
}

impl<K: Into<String>, V: Display> Extend<(K, V)> for Placeholders {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

/// Replaces every `{name}` with its value. Placeholders without a value stay as written.
#[must_use]
pub fn render(content: &str, placeholders: &Placeholders) -> String {
    placeholders.0.iter().fold(content.to_string(), |rendered, (name, value)| {
        rendered.replace(&format!("{{{name}}}"), value)
    })
}

fn format_date(payment: &Payment) -> String {
    payment.payment_date.format("%d/%m/%Y").to_string()
}

#[must_use]
pub fn receipt_message(template: Option<&Template>, payment: &Payment, tenant: &Tenant) -> String {
    match template {
        Some(template) => {
            let placeholders = Placeholders::for_tenant(tenant)
                .with("amount", payment.amount)
                .with("payment_date", format_date(payment))
                .with("remaining_amount", payment.remaining_amount)
                .with("transaction_reference", payment.transaction_reference.as_deref().unwrap_or("N/A"));
            render(&template.content, &placeholders)
        }
        None => {
            let mut message = format!(
                "Receipt: Payment of KES {} received for Unit {} on {}.",
                payment.amount,
                tenant.unit_number,
                format_date(payment)
            );
            if payment.remaining_amount > 0.0 {
                message.push_str(&format!(" Remaining balance: KES {}.", payment.remaining_amount));
            }
            message
        }
    }
}

#[must_use]
pub fn reminder_message(template: Option<&Template>, tenant: &Tenant, remaining_amount: Option<f64>) -> String {
    let due = remaining_amount.unwrap_or(tenant.expected_rent);
    match template {
        Some(template) => {
            let placeholders = Placeholders::for_tenant(tenant).with("amount", due).with("remaining_amount", due);
            render(&template.content, &placeholders)
        }
        None => format!("Reminder: Rent of KES {due} is due for Unit {}.", tenant.unit_number),
    }
}

/// Renders tenant messages, hands them to the SMS collaborator and records every attempt.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: DbContext,
    sms: Arc<dyn SmsSender>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(db: DbContext, sms: Arc<dyn SmsSender>) -> Self {
        Self { db, sms }
    }

    /// Sends without recording anything.
    pub async fn send(&self, phone: &str, message: &str, recipient_name: &str) -> bool {
        self.sms.send(phone, message, recipient_name).await
    }

    /// Sends `message` to the tenant and writes an SMS log entry with the outcome.
    pub async fn deliver(
        &self,
        tenant: &Tenant,
        message: String,
        message_type: &str,
        sent_by: Option<i64>,
    ) -> Result<bool, DbError> {
        let delivered = self.send(&tenant.phone, &message, &tenant.full_name).await;
        db::create_sms_log(&self.db, db::NewSmsLog {
            recipient_phone: tenant.phone.clone(),
            recipient_name: Some(tenant.full_name.clone()),
            message,
            message_type: message_type.to_string(),
            status: delivered.into(),
            sent_by,
        })
        .await?;
        if !delivered {
            tracing::warn!(tenant_id = tenant.id, message_type, "SMS delivery failed");
        }
        Ok(delivered)
    }

    pub async fn send_payment_receipt(
        &self,
        payment: &Payment,
        tenant: &Tenant,
        sent_by: Option<i64>,
    ) -> Result<bool, DbError> {
        let template = db::find_active_template(&self.db, RECEIPT_CATEGORY, Some(RECEIPT_THEME)).await?;
        let message = receipt_message(template.as_ref(), payment, tenant);
        self.deliver(tenant, message, "receipt", sent_by).await
    }

    pub async fn send_rent_reminder(
        &self,
        tenant: &Tenant,
        remaining_amount: Option<f64>,
        sent_by: Option<i64>,
    ) -> Result<bool, DbError> {
        let template = db::find_active_template(&self.db, REMINDER_CATEGORY, None).await?;
        let message = reminder_message(template.as_ref(), tenant, remaining_amount);
        self.deliver(tenant, message, "reminder", sent_by).await
    }
}
