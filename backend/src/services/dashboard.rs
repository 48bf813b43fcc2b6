use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::db::{Payment, Tenant};

#[derive(Debug, PartialEq, Serialize)]
pub struct PartialTenant {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub unit_number: String,
    pub expected_rent: f64,
    pub paid_amount: f64,
    pub remaining_amount: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct OverdueTenant {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub unit_number: String,
    pub expected_rent: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_tenants: usize,
    pub total_expected: f64,
    pub total_collected: f64,
    pub paid_count: usize,
    pub partial_count: usize,
    pub overdue_count: usize,
    pub partial_tenants: Vec<PartialTenant>,
    pub overdue_tenants: Vec<OverdueTenant>,
}

/// First day of the month containing `today` and the first day of the following month.
#[must_use]
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap_or(today);
    let end = start.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// Sorts active tenants into paid, partial and overdue by what they paid this month in total.
///
/// `payments` are the month's payments for every tenant; payments of inactive tenants still
/// count toward `total_collected`.
#[must_use]
pub fn summarize(tenants: &[Tenant], payments: &[Payment]) -> DashboardSummary {
    let mut paid_count = 0;
    let mut partial_tenants = Vec::new();
    let mut overdue_tenants = Vec::new();

    for tenant in tenants {
        let paid_amount: f64 = payments.iter().filter(|p| p.tenant_id == tenant.id).map(|p| p.amount).sum();
        if paid_amount >= tenant.expected_rent {
            paid_count += 1;
        } else if paid_amount > 0.0 {
            partial_tenants.push(PartialTenant {
                tenant_id: tenant.id,
                tenant_name: tenant.full_name.clone(),
                unit_number: tenant.unit_number.clone(),
                expected_rent: tenant.expected_rent,
                paid_amount,
                remaining_amount: tenant.expected_rent - paid_amount,
            });
        } else {
            overdue_tenants.push(OverdueTenant {
                tenant_id: tenant.id,
                tenant_name: tenant.full_name.clone(),
                unit_number: tenant.unit_number.clone(),
                expected_rent: tenant.expected_rent,
            });
        }
    }

    DashboardSummary {
        total_tenants: tenants.len(),
        total_expected: tenants.iter().map(|t| t.expected_rent).sum(),
        total_collected: payments.iter().map(|p| p.amount).sum(),
        paid_count,
        partial_count: partial_tenants.len(),
        overdue_count: overdue_tenants.len(),
        partial_tenants,
        overdue_tenants,
    }
}
