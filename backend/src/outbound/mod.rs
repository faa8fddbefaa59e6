//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **memory**: in-process repositories for tests and database-less runs
//! - **mailer**: activation notice delivery
//!
//! Adapters translate between domain types and infrastructure
//! representations and contain no business logic.

pub mod mailer;
pub mod memory;
pub mod persistence;
