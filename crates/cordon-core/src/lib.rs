//! Core types for the cordon IP denylist aggregator.
//!
//! This crate provides the foundational pieces shared by the feed, engine,
//! and CLI crates:
//!
//! - **IP arithmetic**: dotted-quad <-> `u32` conversion, CIDR -> closed
//!   interval expansion
//! - **Tags and payloads**: the free-form JSON metadata feeds attach to
//!   their ranges, and the type-grouped form lookups return
//! - **Codecs**: the canonical staging-line and index-member wire formats
//! - **Errors**: [`CoreError`] with a crate-wide [`Result`] alias

mod error;
pub mod ip;
pub mod record;
pub mod tag;

pub use error::{CoreError, Result};
pub use ip::{int_to_ip, ip_to_int, network_to_range};
pub use record::{IntervalRecord, SourceRange, MERGED_HEADER, QUOTE};
pub use tag::{Payload, Tag};
