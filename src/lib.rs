pub mod alert;
pub mod batch;
pub mod config;
pub mod interval;
pub mod notify;
pub mod observability;
pub mod queue;
pub mod transaction;
