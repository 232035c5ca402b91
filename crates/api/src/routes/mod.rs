//! Route Handlers

pub mod alerts;
pub mod monitoring;
pub mod readings;
pub mod status;
