//! Delegation credit ledger.
//!
//! This crate owns the accounting of representatives' monthly delegation
//! hours. It provides:
//! - `CreditPeriod` buckets per representative and month, with their invariants
//! - the balance calculator and the usage consumption ladder
//! - the cession engine and its source-selection ladder
//! - period opening with carry-over tranches and expiry
//! - the `CreditStore` boundary and an atomic `InMemoryLedger`
//! - `InvariantAuditor`, which replays the logs against stored periods
//! - `DelegationLedger`, the request surface used by the server and CLI
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use dcl_ledger::{DeclareUsage, DelegationLedger, InMemoryLedger, LedgerConfig, UsageCategory};
//! use dcl_types::{
//!     CreditMonth, FixedClock, Hours, MembershipStatus, Representative, RepresentativeClass,
//!     RepresentativeId,
//! };
//!
//! let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let ledger = DelegationLedger::with_clock(
//!     InMemoryLedger::new(),
//!     LedgerConfig::default(),
//!     Arc::new(FixedClock::new(today)),
//! )
//! .unwrap();
//!
//! let id = RepresentativeId::new("EMP-1").unwrap();
//! ledger
//!     .designate(Representative {
//!         id: id.clone(),
//!         name: "Camille Martin".into(),
//!         class: RepresentativeClass::CouncilMember,
//!         status: MembershipStatus::Titular,
//!         mandate_start: today,
//!         mandate_end: None,
//!         archived: false,
//!     })
//!     .unwrap();
//!
//! let outcome = ledger
//!     .declare_usage(&DeclareUsage {
//!         representative: id.clone(),
//!         date: today,
//!         hours: Hours::from_hours(3),
//!         category: UsageCategory::Meeting,
//!         justification: None,
//!     })
//!     .unwrap();
//! assert!(outcome.is_committed());
//!
//! let view = ledger.delegate_balance(&id, CreditMonth::from_date(today)).unwrap();
//! assert_eq!(view.balance.available, Hours::from_hours(19));
//! ```

pub mod balance;
pub mod cession;
pub mod config;
pub mod consumption;
pub mod error;
pub mod memory;
pub mod period;
pub mod records;
pub mod requests;
pub mod rollover;
pub mod service;
pub mod traits;
pub mod validation;

pub use balance::{compute_balance, Balance, Capacity};
pub use cession::{
    cession_ladder, transferable_capacity, CessionDecision, CessionEngine, CessionInput,
    CessionTarget, SourceBreakdown,
};
pub use config::{BaseHoursEntry, BaseHoursTable, LedgerConfig};
pub use consumption::{consume, draw, Draw, UsageAllocation, CONSUMPTION_ORDER};
pub use error::LedgerError;
pub use memory::{InMemoryLedger, LedgerSnapshot};
pub use period::{CarryTranche, CreditPeriod, PeriodKey};
pub use records::{
    ApprovalState, ApprovalUpdate, Beneficiary, CessionId, CessionRecord, UsageCategory, UsageId,
    UsageRecord,
};
pub use requests::{BeneficiaryRef, CorrectUsage, CreateCession, DeclareUsage, ReverseCession};
pub use rollover::{carry_forward, open_period};
pub use service::{BalanceView, CessionOutcome, DelegationLedger, RolloverReport, UsageOutcome};
pub use traits::{ChangeSet, CommitReceipt, CreditStore};
pub use validation::{AuditReport, Breach, BreachKind, InvariantAuditor};
