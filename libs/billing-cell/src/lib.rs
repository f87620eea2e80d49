//! Return-visit aware billing for the clinic: per-appointment charges, daily
//! revenue reports and the fee policies they are computed from.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
