//! Dashboard statistics.

use serde::Serialize;

use quickbite_core::{Money, OrderStatus};

/// Number of orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Aggregates over the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_orders: i64,
    pub total_users: i64,
    pub total_products: i64,
    /// Sum of totals over `Successful` orders.
    pub total_revenue: Money,
    /// Sum of totals over every order regardless of status.
    pub gross_order_value: Money,
    /// One entry per status, in workflow order, including zero counts.
    pub orders_by_status: Vec<StatusCount>,
}

impl Stats {
    /// Fill in zero counts so every status appears once.
    #[must_use]
    pub fn status_counts(found: &[(OrderStatus, i64)]) -> Vec<StatusCount> {
        OrderStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: found
                    .iter()
                    .filter(|(s, _)| *s == status)
                    .map(|(_, n)| n)
                    .sum(),
            })
            .collect()
    }
}
