//! Foundation types for the delegation credit ledger (DCL).
//!
//! This crate provides the quantity, calendar, and identity types shared by
//! every other DCL crate.
//!
//! # Key Types
//!
//! - [`Hours`] — Exact credit quantity, stored as whole minutes
//! - [`CreditMonth`] — Calendar month a credit period belongs to
//! - [`Clock`] — Injectable source of "today" for date-sensitive rules
//! - [`RepresentativeId`] — Stable identifier of an employee representative
//! - [`Representative`] — Mandate holder with class and membership status
//! - [`CreditSource`] — The three buckets a period's credit comes from

pub mod calendar;
pub mod error;
pub mod hours;
pub mod identity;
pub mod representative;
pub mod source;

pub use calendar::{Clock, CreditMonth, FixedClock, SystemClock};
pub use error::TypeError;
pub use hours::Hours;
pub use identity::RepresentativeId;
pub use representative::{MembershipStatus, Representative, RepresentativeClass};
pub use source::CreditSource;
