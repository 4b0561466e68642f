#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! Sustainability certification engine for lodging establishments.
//!
//! Four components share one key-value store:
//! - [`registry`]: accommodations and the auditor allow-list
//! - [`standards`]: environmental metrics and the aggregate sustainability score
//! - [`audit`]: append-only, hash-chained audit outcomes
//! - [`certification`]: issuance, renewal, revocation and lazy expiry
//!
//! [`CertificationEngine`] is the entry point. It serializes operations and
//! commits each one atomically.
//!
//! ```rust
//! use ecocert::{
//!     AuditScores, CallContext, CertificationEngine, CertificationLevel, EngineConfig,
//!     Metrics, NewAccommodation, NewAudit, Principal,
//! };
//!
//! let owner = Principal::new("SP0OWNER")?;
//! let host = Principal::new("SP1HOST")?;
//! let auditor = Principal::new("SP2AUDIT")?;
//! let engine = CertificationEngine::in_memory(&EngineConfig::new(owner.clone()))?;
//!
//! engine.authorize_auditor(&CallContext::new(owner, 1), &auditor, "energy")?;
//! let id = engine.register(
//!     &CallContext::new(host, 2),
//!     NewAccommodation {
//!         name: "Cloud Forest Lodge".into(),
//!         location: "Monteverde".into(),
//!         category: "eco-lodge".into(),
//!         capacity: 10,
//!     },
//! )?;
//!
//! let at = CallContext::new(auditor, 3);
//! engine.update_standards(&at, id, Metrics {
//!     energy_efficiency: 90,
//!     water_conservation: 90,
//!     waste_management: 90,
//!     renewable_energy: 90,
//!     carbon_footprint: 1,
//!     local_sourcing: 90,
//! })?;
//! let audit = engine.conduct_audit(&at, id, NewAudit {
//!     audit_type: "annual".into(),
//!     scores: AuditScores { energy: 80, water: 80, waste: 80 },
//!     compliance_issues: 0,
//!     recommendations: String::new(),
//! })?;
//! let grant = engine.issue_certification(&at, id, audit.audit_id)?;
//! assert_eq!(grant.level, CertificationLevel::Platinum);
//! assert!(engine.is_certification_valid(id, 4));
//! # Ok::<(), ecocert::Error>(())
//! ```

pub mod audit;
pub mod certification;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod standards;
pub mod store;
pub mod types;

pub use audit::{AuditOutcome, AuditRecord, AuditScores, NewAudit};
pub use certification::{
    Certification, CertificationGrant, CertificationLevel, CertificationStatus,
};
pub use config::{EngineConfig, StorageConfig, DEFAULT_VALIDITY_PERIOD};
pub use engine::CertificationEngine;
pub use error::{Error, ErrorKind, Result};
pub use registry::{Accommodation, AuditorInfo, NewAccommodation};
pub use standards::{EnvironmentalStandards, Metrics};
pub use store::{InMemoryStore, SqliteStore, Store, StoreKey, Transaction};
pub use types::{AccommodationId, AuditId, CallContext, Height, Principal};
