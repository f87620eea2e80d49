pub mod calculator;
pub mod fee_policy;
pub mod ledger;
pub mod lifecycle;
pub mod prior_visit;
pub mod revenue;
