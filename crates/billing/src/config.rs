use schoolbooks_core::Money;

/// Tunable billing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    /// Fixed penalty assessed when an invoice first turns overdue.
    pub penalty_amount: Money,
    /// Day of month invoices fall due.
    pub due_day: u32,
    /// Page size for the overdue sweep.
    pub sweep_page_size: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            penalty_amount: Money::from_cents(1_000),
            due_day: 10,
            sweep_page_size: 50,
        }
    }
}
