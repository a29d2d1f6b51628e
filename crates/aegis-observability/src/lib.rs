//! # aegis-observability
//!
//! Logging and audit-trail infrastructure for the Aegis response engine.
//!
//! This crate provides structured logging setup on top of the tracing
//! ecosystem and the audit sink every engine operation reports into.

pub mod audit;
pub mod logging;

pub use audit::{AuditEventKind, AuditRecord, AuditSink, MemoryAuditLog};
pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
