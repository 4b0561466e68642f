use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest as _, Sha256};

use crate::registry;
use crate::store::{Counter, StoreKey, Transaction};
use crate::types::{AccommodationId, AuditId, CallContext, Height, Principal};
use crate::{Error, Result};

/// Minimum mean sub-score for an audit to pass.
pub const PASS_THRESHOLD: u32 = 60;
/// Maximum compliance issues tolerated by a passing audit.
pub const MAX_COMPLIANCE_ISSUES: u32 = 3;
pub const MAX_SUB_SCORE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditScores {
    pub energy: u32,
    pub water: u32,
    pub waste: u32,
}

impl AuditScores {
    /// Truncated mean of the three sub-scores.
    pub fn mean(&self) -> u32 {
        let total = u64::from(self.energy) + u64::from(self.water) + u64::from(self.waste);
        u32::try_from(total / 3).unwrap_or(u32::MAX)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("energy_score", self.energy),
            ("water_score", self.water),
            ("waste_score", self.waste),
        ] {
            if value > MAX_SUB_SCORE {
                return Err(Error::InvalidInput(format!(
                    "{field} must be within 0..={MAX_SUB_SCORE}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

pub fn audit_passed(scores: &AuditScores, compliance_issues: u32) -> bool {
    scores.mean() >= PASS_THRESHOLD && compliance_issues <= MAX_COMPLIANCE_ISSUES
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAudit {
    pub audit_type: String,
    pub scores: AuditScores,
    pub compliance_issues: u32,
    pub recommendations: String,
}

/// Immutable once written. `is_passed` is fixed at creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: AuditId,
    pub accommodation_id: AccommodationId,
    pub auditor: Principal,
    pub audit_type: String,
    pub energy_score: u32,
    pub water_score: u32,
    pub waste_score: u32,
    pub compliance_issues: u32,
    pub recommendations: String,
    pub conducted_at: Height,
    pub is_passed: bool,
    pub previous_hash: String,
    pub content_hash: String,
}

impl AuditRecord {
    pub fn scores(&self) -> AuditScores {
        AuditScores {
            energy: self.energy_score,
            water: self.water_score,
            waste: self.waste_score,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOutcome {
    pub audit_id: AuditId,
    pub passed: bool,
    pub score: u32,
}

pub fn get(tx: &Transaction<'_>, id: AuditId) -> Result<Option<AuditRecord>> {
    tx.read(&StoreKey::Audit(id))
}

/// All audits for one accommodation, in submission order.
pub fn list_for(tx: &Transaction<'_>, accommodation_id: AccommodationId) -> Result<Vec<AuditRecord>> {
    let next = tx.counter(Counter::NextAuditId)?;
    let mut audits = Vec::new();
    for id in 1..next {
        if let Some(record) = get(tx, id)? {
            if record.accommodation_id == accommodation_id {
                audits.push(record);
            }
        }
    }
    Ok(audits)
}

pub(crate) fn conduct(
    tx: &mut Transaction<'_>,
    ctx: &CallContext,
    accommodation_id: AccommodationId,
    input: NewAudit,
) -> Result<AuditOutcome> {
    registry::require_auditor(tx, &ctx.caller)?;
    let accommodation = registry::require_accommodation(tx, accommodation_id)?;
    input.scores.validate()?;
    registry::require_active(&accommodation)?;

    let audit_id = tx.allocate(Counter::NextAuditId)?;
    let score = input.scores.mean();
    let passed = audit_passed(&input.scores, input.compliance_issues);

    let previous_hash = chain_head(tx)?;
    let mut record = AuditRecord {
        id: audit_id,
        accommodation_id,
        auditor: ctx.caller.clone(),
        audit_type: input.audit_type,
        energy_score: input.scores.energy,
        water_score: input.scores.water,
        waste_score: input.scores.waste,
        compliance_issues: input.compliance_issues,
        recommendations: input.recommendations,
        conducted_at: ctx.height,
        is_passed: passed,
        previous_hash,
        content_hash: String::new(),
    };
    record.content_hash = compute_chain_hash_hex(
        &record.previous_hash,
        canonical_audit_payload(&record)?.as_bytes(),
    )?;

    tx.write(&StoreKey::Audit(audit_id), &record)?;
    tx.write(&StoreKey::AuditChainHead, &record.content_hash)?;
    registry::record_certification_action(tx, &ctx.caller)?;

    Ok(AuditOutcome {
        audit_id,
        passed,
        score,
    })
}

/// Recompute every link of the audit hash chain.
pub fn verify_chain(tx: &Transaction<'_>) -> Result<bool> {
    let next = tx.counter(Counter::NextAuditId)?;
    let mut prev = genesis_hash();
    for id in 1..next {
        let Some(record) = get(tx, id)? else {
            return Ok(false);
        };
        if record.previous_hash != prev {
            return Ok(false);
        }
        let expected =
            compute_chain_hash_hex(&prev, canonical_audit_payload(&record)?.as_bytes())?;
        if expected != record.content_hash {
            return Ok(false);
        }
        prev = record.content_hash;
    }

    let head: Option<String> = tx.read(&StoreKey::AuditChainHead)?;
    Ok(head.unwrap_or_else(genesis_hash) == prev)
}

fn genesis_hash() -> String {
    hex::encode([0u8; 32])
}

fn chain_head(tx: &Transaction<'_>) -> Result<String> {
    Ok(tx
        .read::<String>(&StoreKey::AuditChainHead)?
        .unwrap_or_else(genesis_hash))
}

// serde_json maps keep keys sorted, so the rendering is stable.
fn canonical_audit_payload(record: &AuditRecord) -> Result<String> {
    let payload: Value = serde_json::json!({
        "auditId": record.id,
        "accommodationId": record.accommodation_id,
        "auditor": record.auditor.as_str(),
        "auditType": record.audit_type,
        "scores": {
            "energy": record.energy_score,
            "water": record.water_score,
            "waste": record.waste_score,
        },
        "complianceIssues": record.compliance_issues,
        "recommendations": record.recommendations,
        "conductedAt": record.conducted_at,
        "isPassed": record.is_passed,
    });
    Ok(serde_json::to_string(&payload)?)
}

fn compute_chain_hash_hex(previous_hash_hex: &str, canonical_bytes: &[u8]) -> Result<String> {
    let prev_bytes = hex::decode(previous_hash_hex)
        .map_err(|e| Error::InvalidInput(format!("invalid previous hash hex: {e}")))?;
    let prev_bytes: [u8; 32] = prev_bytes
        .try_into()
        .map_err(|_| Error::InvalidInput("previous hash must be 32 bytes".to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(prev_bytes);
    hasher.update(canonical_bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NewAccommodation;
    use crate::store::InMemoryStore;

    fn scores(energy: u32, water: u32, waste: u32) -> AuditScores {
        AuditScores {
            energy,
            water,
            waste,
        }
    }

    #[test]
    fn pass_boundaries() {
        assert!(audit_passed(&scores(60, 60, 60), 3));
        assert!(!audit_passed(&scores(59, 59, 59), 0));
        assert!(!audit_passed(&scores(60, 60, 60), 4));
        // 60+60+59 = 179 -> 59
        assert!(!audit_passed(&scores(60, 60, 59), 0));
        // 100+80+0 = 180 -> 60
        assert!(audit_passed(&scores(100, 80, 0), 0));
    }

    #[test]
    fn sub_score_over_100_rejected() {
        assert!(scores(101, 0, 0).validate().is_err());
        assert!(scores(100, 100, 100).validate().is_ok());
    }

    fn setup(store: &InMemoryStore) -> (Principal, CallContext) {
        let owner = Principal::new("SP0OWNER").unwrap();
        let auditor = Principal::new("SP2AUDIT").unwrap();
        let mut tx = Transaction::begin(store);
        registry::authorize_auditor(
            &mut tx,
            &CallContext::new(owner.clone(), 1),
            &owner,
            &auditor,
            "energy".to_string(),
        )
        .unwrap();
        registry::register(
            &mut tx,
            &CallContext::new(Principal::new("SP1HOST").unwrap(), 1),
            NewAccommodation {
                name: "Lodge".to_string(),
                location: "Azores".to_string(),
                category: "hotel".to_string(),
                capacity: 10,
            },
        )
        .unwrap();
        tx.commit().unwrap();
        (auditor.clone(), CallContext::new(auditor, 2))
    }

    fn new_audit(energy: u32, issues: u32) -> NewAudit {
        NewAudit {
            audit_type: "annual".to_string(),
            scores: scores(energy, 70, 70),
            compliance_issues: issues,
            recommendations: "ok".to_string(),
        }
    }

    #[test]
    fn conduct_links_chain_and_counts_actions() {
        let store = InMemoryStore::default();
        let (auditor, ctx) = setup(&store);

        let mut tx = Transaction::begin(&store);
        let first = conduct(&mut tx, &ctx, 1, new_audit(70, 1)).unwrap();
        let second = conduct(&mut tx, &ctx, 1, new_audit(10, 5)).unwrap();
        tx.commit().unwrap();

        assert_eq!(first.audit_id, 1);
        assert!(first.passed);
        assert_eq!(first.score, 70);
        assert_eq!(second.audit_id, 2);
        assert!(!second.passed);

        let tx = Transaction::begin(&store);
        let a1 = get(&tx, 1).unwrap().unwrap();
        let a2 = get(&tx, 2).unwrap().unwrap();
        assert_eq!(a1.previous_hash, genesis_hash());
        assert_eq!(a2.previous_hash, a1.content_hash);
        assert!(verify_chain(&tx).unwrap());
        assert_eq!(list_for(&tx, 1).unwrap().len(), 2);
        assert!(list_for(&tx, 2).unwrap().is_empty());

        let info = registry::get_auditor(&tx, &auditor).unwrap().unwrap();
        assert_eq!(info.certification_count, 2);
    }

    #[test]
    fn chain_detects_tampering() {
        let store = InMemoryStore::default();
        let (_, ctx) = setup(&store);

        let mut tx = Transaction::begin(&store);
        conduct(&mut tx, &ctx, 1, new_audit(70, 1)).unwrap();
        conduct(&mut tx, &ctx, 1, new_audit(80, 0)).unwrap();
        tx.commit().unwrap();

        let mut tx = Transaction::begin(&store);
        let mut a1 = get(&tx, 1).unwrap().unwrap();
        a1.is_passed = !a1.is_passed;
        tx.write(&StoreKey::Audit(1), &a1).unwrap();
        tx.commit().unwrap();

        let tx = Transaction::begin(&store);
        assert!(!verify_chain(&tx).unwrap());
    }

    #[test]
    fn non_auditor_rejected_before_lookup() {
        let store = InMemoryStore::default();
        let _ = setup(&store);
        let mut tx = Transaction::begin(&store);
        let host = CallContext::new(Principal::new("SP1HOST").unwrap(), 2);

        let err = conduct(&mut tx, &host, 99, new_audit(70, 0)).unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
        assert_eq!(tx.staged_len(), 0);
    }
}
