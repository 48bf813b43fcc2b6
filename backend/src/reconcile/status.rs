use serde::{Deserialize, Serialize};

/// Whether a single payment covers the tenant's expected rent.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
pub enum PaymentStatus {
    Full,
    Partial,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub status: PaymentStatus,
    pub remaining_amount: f64,
}

/// Classifies one payment against the expected rent.
///
/// The amount is not validated here; callers reject non-positive amounts first.
/// Only this payment is considered, not what the tenant already paid this period.
#[must_use]
pub fn classify(amount: f64, expected_rent: f64) -> Classification {
    if amount >= expected_rent {
        Classification { status: PaymentStatus::Full, remaining_amount: 0.0 }
    } else {
        Classification { status: PaymentStatus::Partial, remaining_amount: expected_rent - amount }
    }
}
