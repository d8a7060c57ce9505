mod errors;
mod monetary;
#[cfg(test)]
mod tests;
mod tolerances;

pub use errors::AmountError;
pub use monetary::{checked_total, deserialize_amount, distribute_evenly, max_amount, parse_amount, round_to_cents, within};
pub use tolerances::Tolerances;

pub type TransactionId = String;
pub type GroupId = String;
pub type AccountId = String;
