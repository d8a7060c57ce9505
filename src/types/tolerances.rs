use rust_decimal::Decimal;

/// Numeric tolerances shared by the relationship components.
///
/// All values are absolute currency units. The defaults are one cent for sum
/// reconciliation, and 10 / 100 units for classifying a transfer group's net balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerances {
    /// Maximum (exclusive) difference for two amounts to be considered equal.
    pub epsilon: Decimal,
    /// A transfer group whose absolute net is below this is balanced.
    pub transfer_balanced_below: Decimal,
    /// A transfer group whose absolute net is below this (and not balanced) only warrants a warning.
    pub transfer_warning_below: Decimal
}

impl Tolerances {
    pub fn with_epsilon(mut self, epsilon: Decimal) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_transfer_thresholds(mut self, balanced_below: Decimal, warning_below: Decimal) -> Self {
        self.transfer_balanced_below = balanced_below;
        self.transfer_warning_below = warning_below;
        self
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            epsilon: Decimal::new(1, 2),
            transfer_balanced_below: Decimal::TEN,
            transfer_warning_below: Decimal::ONE_HUNDRED
        }
    }
}
