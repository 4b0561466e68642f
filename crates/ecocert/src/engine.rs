//! Serialized entry points over the four components.
//!
//! Every write runs under a single engine-wide lock against one
//! [`Transaction`]; its staged writes are committed only if the whole
//! operation succeeds.

use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::audit::{self, AuditOutcome, AuditRecord, NewAudit};
use crate::certification::{
    self, Certification, CertificationGrant, CertificationLevel, CertificationStatus,
};
use crate::config::EngineConfig;
use crate::registry::{self, Accommodation, AuditorInfo, NewAccommodation};
use crate::standards::{self, EnvironmentalStandards, Metrics};
use crate::store::{Counter, InMemoryStore, SqliteStore, Store, Transaction};
use crate::types::{AccommodationId, AuditId, CallContext, Height, Principal};
use crate::Result;

pub struct CertificationEngine<S: Store = InMemoryStore> {
    store: S,
    registry_owner: Principal,
    validity_period: Height,
    op_lock: Mutex<()>,
}

impl CertificationEngine<InMemoryStore> {
    pub fn in_memory(config: &EngineConfig) -> Result<Self> {
        Self::with_store(config, InMemoryStore::default())
    }
}

impl CertificationEngine<SqliteStore> {
    /// SQLite at `config.storage.path`, or an in-memory database if unset.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let store = match config.storage.path.as_ref() {
            Some(path) => SqliteStore::new(path)?,
            None => SqliteStore::in_memory()?,
        };
        Self::with_store(config, store)
    }
}

impl<S: Store> CertificationEngine<S> {
    pub fn with_store(config: &EngineConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            registry_owner: config.owner()?,
            validity_period: config.validity_period,
            op_lock: Mutex::new(()),
        })
    }

    pub fn registry_owner(&self) -> &Principal {
        &self.registry_owner
    }

    pub fn validity_period(&self) -> Height {
        self.validity_period
    }

    fn lock_ops(&self) -> std::sync::MutexGuard<'_, ()> {
        self.op_lock.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn execute<T>(
        &self,
        operation: &'static str,
        ctx: &CallContext,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock_ops();
        let mut tx = Transaction::begin(&self.store);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!(
                    operation,
                    caller = %ctx.caller,
                    height = ctx.height,
                    code = err.kind().code(),
                    error = %err,
                    "Operation rejected"
                );
                Err(err)
            }
        }
    }

    /// Reads never surface errors; storage failures fail closed.
    fn query<T>(
        &self,
        accessor: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> Result<Option<T>>,
    ) -> Option<T> {
        let _guard = self.lock_ops();
        let tx = Transaction::begin(&self.store);
        match f(&tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(accessor, error = %err, "Read failed; reporting absent");
                None
            }
        }
    }

    // -- writes -----------------------------------------------------------

    /// Register an accommodation owned by the caller and seed its standards.
    pub fn register(&self, ctx: &CallContext, input: NewAccommodation) -> Result<AccommodationId> {
        let id = self.execute("register", ctx, |tx| {
            let id = registry::register(tx, ctx, input)?;
            standards::seed(tx, id, ctx.height)?;
            Ok(id)
        })?;
        info!(accommodation_id = id, owner = %ctx.caller, "Registered accommodation");
        Ok(id)
    }

    pub fn authorize_auditor(
        &self,
        ctx: &CallContext,
        auditor: &Principal,
        specialization: impl Into<String>,
    ) -> Result<()> {
        let specialization = specialization.into();
        self.execute("authorize_auditor", ctx, |tx| {
            registry::authorize_auditor(tx, ctx, &self.registry_owner, auditor, specialization)
        })?;
        info!(auditor = %auditor, "Authorized auditor");
        Ok(())
    }

    pub fn update_standards(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
        metrics: Metrics,
    ) -> Result<u32> {
        let score = self.execute("update_standards", ctx, |tx| {
            standards::update(tx, ctx, accommodation_id, metrics)
        })?;
        info!(accommodation_id, caller = %ctx.caller, score, "Updated environmental standards");
        Ok(score)
    }

    pub fn conduct_audit(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
        input: NewAudit,
    ) -> Result<AuditOutcome> {
        let outcome = self.execute("conduct_audit", ctx, |tx| {
            audit::conduct(tx, ctx, accommodation_id, input)
        })?;
        info!(
            accommodation_id,
            audit_id = outcome.audit_id,
            auditor = %ctx.caller,
            passed = outcome.passed,
            score = outcome.score,
            "Recorded audit"
        );
        Ok(outcome)
    }

    pub fn issue_certification(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
        audit_id: AuditId,
    ) -> Result<CertificationGrant> {
        let grant = self.execute("issue_certification", ctx, |tx| {
            certification::issue(tx, ctx, self.validity_period, accommodation_id, audit_id)
        })?;
        info!(
            accommodation_id,
            audit_id,
            certified_by = %ctx.caller,
            level = %grant.level,
            score = grant.score,
            expires_at = grant.expires_at,
            "Issued certification"
        );
        Ok(grant)
    }

    pub fn renew_certification(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
        new_audit_id: AuditId,
    ) -> Result<CertificationGrant> {
        let grant = self.execute("renew_certification", ctx, |tx| {
            certification::renew(tx, ctx, self.validity_period, accommodation_id, new_audit_id)
        })?;
        info!(
            accommodation_id,
            audit_id = new_audit_id,
            renewed_by = %ctx.caller,
            level = %grant.level,
            score = grant.score,
            expires_at = grant.expires_at,
            "Renewed certification"
        );
        Ok(grant)
    }

    /// Suspend or reinstate an accommodation. Registry owner only.
    pub fn set_accommodation_active(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
        active: bool,
    ) -> Result<Accommodation> {
        let accommodation = self.execute("set_accommodation_active", ctx, |tx| {
            registry::set_active(tx, ctx, &self.registry_owner, accommodation_id, active)
        })?;
        info!(accommodation_id, active, "Changed accommodation status");
        Ok(accommodation)
    }

    pub fn revoke_certification(
        &self,
        ctx: &CallContext,
        accommodation_id: AccommodationId,
    ) -> Result<Certification> {
        let revoked = self.execute("revoke_certification", ctx, |tx| {
            certification::revoke(tx, ctx, &self.registry_owner, accommodation_id)
        })?;
        info!(accommodation_id, revoked_by = %ctx.caller, "Revoked certification");
        Ok(revoked)
    }

    // -- reads ------------------------------------------------------------

    pub fn get_accommodation(&self, id: AccommodationId) -> Option<Accommodation> {
        self.query("get_accommodation", |tx| registry::get_accommodation(tx, id))
    }

    pub fn get_standards(&self, id: AccommodationId) -> Option<EnvironmentalStandards> {
        self.query("get_standards", |tx| standards::get(tx, id))
    }

    pub fn get_certification(&self, id: AccommodationId) -> Option<Certification> {
        self.query("get_certification", |tx| certification::get(tx, id))
    }

    pub fn get_audit_record(&self, id: AuditId) -> Option<AuditRecord> {
        self.query("get_audit_record", |tx| audit::get(tx, id))
    }

    pub fn get_auditor_info(&self, principal: &Principal) -> Option<AuditorInfo> {
        self.query("get_auditor_info", |tx| registry::get_auditor(tx, principal))
    }

    pub fn is_owner(&self, id: AccommodationId, principal: &Principal) -> bool {
        self.query("is_owner", |tx| registry::is_owner(tx, id, principal).map(Some))
            .unwrap_or(false)
    }

    pub fn is_authorized_auditor(&self, principal: &Principal) -> bool {
        self.query("is_authorized_auditor", |tx| {
            registry::is_authorized_auditor(tx, principal).map(Some)
        })
        .unwrap_or(false)
    }

    pub fn is_certification_valid(&self, id: AccommodationId, height: Height) -> bool {
        self.get_certification(id)
            .is_some_and(|c| certification::is_current(&c, height))
    }

    /// The level, only while the certification is valid and unexpired.
    pub fn get_certification_level(
        &self,
        id: AccommodationId,
        height: Height,
    ) -> Option<CertificationLevel> {
        self.get_certification(id)
            .filter(|c| certification::is_current(c, height))
            .map(|c| c.level)
    }

    pub fn certification_status(
        &self,
        id: AccommodationId,
        height: Height,
    ) -> Option<CertificationStatus> {
        self.get_certification(id)
            .map(|c| certification::effective_status(&c, height))
    }

    pub fn get_next_accommodation_id(&self) -> Option<AccommodationId> {
        self.query("get_next_accommodation_id", |tx| {
            tx.counter(Counter::NextAccommodationId).map(Some)
        })
    }

    pub fn get_next_audit_id(&self) -> Option<AuditId> {
        self.query("get_next_audit_id", |tx| tx.counter(Counter::NextAuditId).map(Some))
    }

    pub fn list_audits(&self, accommodation_id: AccommodationId) -> Vec<AuditRecord> {
        self.query("list_audits", |tx| audit::list_for(tx, accommodation_id).map(Some))
            .unwrap_or_default()
    }

    pub fn verify_audit_chain(&self) -> Result<bool> {
        let _guard = self.lock_ops();
        let tx = Transaction::begin(&self.store);
        audit::verify_chain(&tx)
    }
}
