use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditRecord};
use crate::registry;
use crate::standards;
use crate::store::{StoreKey, Transaction};
use crate::types::{AccommodationId, AuditId, CallContext, Height, Principal};
use crate::{Error, Result};

pub const PLATINUM_THRESHOLD: u32 = 90;
pub const GOLD_THRESHOLD: u32 = 80;
pub const SILVER_THRESHOLD: u32 = 70;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl CertificationLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= PLATINUM_THRESHOLD {
            CertificationLevel::Platinum
        } else if score >= GOLD_THRESHOLD {
            CertificationLevel::Gold
        } else if score >= SILVER_THRESHOLD {
            CertificationLevel::Silver
        } else {
            CertificationLevel::Bronze
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertificationLevel::Bronze => "bronze",
            CertificationLevel::Silver => "silver",
            CertificationLevel::Gold => "gold",
            CertificationLevel::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for CertificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationStatus {
    Active,
    Expired,
    Revoked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub level: CertificationLevel,
    pub score: u32,
    pub issued_at: Height,
    pub expires_at: Height,
    pub is_valid: bool,
    pub certified_by: Principal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationGrant {
    pub level: CertificationLevel,
    pub score: u32,
    pub expires_at: Height,
}

/// Valid and unexpired at `height`. Every read path goes through here.
pub fn is_current(certification: &Certification, height: Height) -> bool {
    certification.is_valid && certification.expires_at > height
}

pub fn effective_status(certification: &Certification, height: Height) -> CertificationStatus {
    if !certification.is_valid {
        return CertificationStatus::Revoked;
    }
    if !is_current(certification, height) {
        return CertificationStatus::Expired;
    }
    CertificationStatus::Active
}

pub fn get(tx: &Transaction<'_>, accommodation_id: AccommodationId) -> Result<Option<Certification>> {
    tx.read(&StoreKey::Certification(accommodation_id))
}

/// Load an audit and check it is a passing audit of `accommodation_id`.
fn require_passing_audit(
    tx: &Transaction<'_>,
    accommodation_id: AccommodationId,
    audit_id: AuditId,
) -> Result<AuditRecord> {
    let record = audit::get(tx, audit_id)?
        .ok_or_else(|| Error::InvalidInput(format!("audit {audit_id} does not exist")))?;
    if record.accommodation_id != accommodation_id {
        return Err(Error::InvalidInput(format!(
            "audit {audit_id} belongs to accommodation {}, not {accommodation_id}",
            record.accommodation_id
        )));
    }
    if !record.is_passed {
        return Err(Error::InvalidInput(format!("audit {audit_id} did not pass")));
    }
    Ok(record)
}

/// Issue (or silently re-issue) a certification from the current aggregate
/// sustainability score.
pub(crate) fn issue(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    validity_period: Height,
    accommodation_id: AccommodationId,
    audit_id: AuditId,
) -> Result<CertificationGrant> {
    registry::require_auditor(tx, &ctx.caller)?;
    let accommodation = registry::require_accommodation(tx, accommodation_id)?;
    let standards = standards::get(tx, accommodation_id)?.ok_or_else(|| {
        Error::AccommodationNotFound(format!(
            "standards record for accommodation {accommodation_id}"
        ))
    })?;
    require_passing_audit(tx, accommodation_id, audit_id)?;
    registry::require_active(&accommodation)?;

    let score = standards.overall_sustainability_score;
    let certification = Certification {
        level: CertificationLevel::from_score(score),
        score,
        issued_at: ctx.height,
        expires_at: ctx.height.saturating_add(validity_period),
        is_valid: true,
        certified_by: ctx.caller.clone(),
    };
    tx.write(&StoreKey::Certification(accommodation_id), &certification)?;

    Ok(CertificationGrant {
        level: certification.level,
        score,
        expires_at: certification.expires_at,
    })
}

/// Renew from the new audit's own sub-score mean. Validity flag and issuer
/// carry over from the existing certification.
pub(crate) fn renew(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    validity_period: Height,
    accommodation_id: AccommodationId,
    new_audit_id: AuditId,
) -> Result<CertificationGrant> {
    registry::require_auditor(tx, &ctx.caller)?;
    let mut certification = get(tx, accommodation_id)?.ok_or_else(|| {
        Error::AccommodationNotFound(format!(
            "certification for accommodation {accommodation_id}"
        ))
    })?;
    let record = require_passing_audit(tx, accommodation_id, new_audit_id)?;
    if !certification.is_valid {
        return Err(Error::InvalidInput(format!(
            "certification for accommodation {accommodation_id} is not valid"
        )));
    }

    let score = record.scores().mean();
    certification.level = CertificationLevel::from_score(score);
    certification.score = score;
    certification.issued_at = ctx.height;
    certification.expires_at = ctx.height.saturating_add(validity_period);
    tx.write(&StoreKey::Certification(accommodation_id), &certification)?;

    Ok(CertificationGrant {
        level: certification.level,
        score,
        expires_at: certification.expires_at,
    })
}

pub(crate) fn revoke(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    registry_owner: &Principal,
    accommodation_id: AccommodationId,
) -> Result<Certification> {
    if &ctx.caller != registry_owner {
        return Err(Error::NotAuthorized(format!(
            "{} is not the registry owner",
            ctx.caller
        )));
    }
    let mut certification = get(tx, accommodation_id)?.ok_or_else(|| {
        Error::AccommodationNotFound(format!(
            "certification for accommodation {accommodation_id}"
        ))
    })?;
    certification.is_valid = false;
    tx.write(&StoreKey::Certification(accommodation_id), &certification)?;
    Ok(certification)
}
