//! Full lifecycle: register, score, audit, certify, expire, renew.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use ecocert::{
    AuditScores, CallContext, CertificationEngine, CertificationLevel, EngineConfig, Error,
    ErrorKind, Metrics, NewAccommodation, NewAudit, Principal, DEFAULT_VALIDITY_PERIOD,
};

fn principal(id: &str) -> Principal {
    Principal::new(id).expect("principal")
}

fn lodge(capacity: u32) -> NewAccommodation {
    NewAccommodation {
        name: "Casa Verde".to_string(),
        location: "Oaxaca".to_string(),
        category: "boutique-hotel".to_string(),
        capacity,
    }
}

#[test]
fn register_score_audit_issue_scenario() {
    let owner = principal("SP0OWNER");
    let host = principal("SP1HOST");
    let auditor = principal("SP2AUDIT");
    let engine = CertificationEngine::in_memory(&EngineConfig::new(owner.clone())).unwrap();

    engine
        .authorize_auditor(&CallContext::new(owner, 1), &auditor, "hospitality")
        .unwrap();

    let id = engine.register(&CallContext::new(host.clone(), 2), lodge(10)).unwrap();
    assert_eq!(id, 1);

    let score = engine
        .update_standards(
            &CallContext::new(host, 3),
            id,
            Metrics {
                energy_efficiency: 80,
                water_conservation: 80,
                waste_management: 80,
                renewable_energy: 20,
                carbon_footprint: 2,
                local_sourcing: 50,
            },
        )
        .unwrap();
    assert_eq!(score, 65);

    let at = CallContext::new(auditor.clone(), 4);
    let outcome = engine
        .conduct_audit(
            &at,
            id,
            NewAudit {
                audit_type: "initial".to_string(),
                scores: AuditScores {
                    energy: 70,
                    water: 70,
                    waste: 70,
                },
                compliance_issues: 1,
                recommendations: "ok".to_string(),
            },
        )
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.score, 70);
    assert_eq!(outcome.audit_id, 1);

    // Issuance reads the aggregate standards score (65), not the audit's 70.
    let grant = engine.issue_certification(&at, id, outcome.audit_id).unwrap();
    assert_eq!(grant.level, CertificationLevel::Bronze);
    assert_eq!(grant.score, 65);
    assert_eq!(grant.expires_at, 4 + DEFAULT_VALIDITY_PERIOD);

    let cert = engine.get_certification(id).unwrap();
    assert_eq!(cert.certified_by, auditor);
    assert!(engine.is_certification_valid(id, 5));
    assert_eq!(engine.get_auditor_info(&auditor).unwrap().certification_count, 1);
    assert_eq!(engine.get_next_audit_id(), Some(2));

    // Renewal reads the audit's own sub-scores.
    let renewal_audit = engine
        .conduct_audit(
            &CallContext::new(auditor.clone(), 100),
            id,
            NewAudit {
                audit_type: "renewal".to_string(),
                scores: AuditScores {
                    energy: 85,
                    water: 80,
                    waste: 78,
                },
                compliance_issues: 0,
                recommendations: "solar water heating".to_string(),
            },
        )
        .unwrap();
    let renewed = engine
        .renew_certification(&CallContext::new(auditor, 100), id, renewal_audit.audit_id)
        .unwrap();
    assert_eq!(renewed.score, 81);
    assert_eq!(renewed.level, CertificationLevel::Gold);
    assert_eq!(renewed.expires_at, 100 + DEFAULT_VALIDITY_PERIOD);
    assert_eq!(engine.get_standards(id).unwrap().overall_sustainability_score, 65);

    assert!(engine.verify_audit_chain().unwrap());
}

#[test]
fn id_sequences_skip_nothing_on_failure() {
    let owner = principal("SP0OWNER");
    let host = principal("SP1HOST");
    let auditor = principal("SP2AUDIT");
    let engine = CertificationEngine::in_memory(&EngineConfig::new(owner.clone())).unwrap();
    engine
        .authorize_auditor(&CallContext::new(owner, 1), &auditor, "energy")
        .unwrap();

    let ctx = CallContext::new(host, 2);
    assert_eq!(engine.register(&ctx, lodge(1)).unwrap(), 1);
    assert!(engine.register(&ctx, lodge(0)).is_err());
    assert_eq!(engine.register(&ctx, lodge(2)).unwrap(), 2);

    let at = CallContext::new(auditor, 3);
    let bad = NewAudit {
        audit_type: "spot".to_string(),
        scores: AuditScores {
            energy: 101,
            water: 0,
            waste: 0,
        },
        compliance_issues: 0,
        recommendations: String::new(),
    };
    let err = engine.conduct_audit(&at, 1, bad.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = engine.conduct_audit(&at, 9, bad.clone()).unwrap_err();
    assert!(matches!(err, Error::AccommodationNotFound(_)));

    let good = NewAudit {
        scores: AuditScores {
            energy: 10,
            water: 10,
            waste: 10,
        },
        ..bad
    };
    assert_eq!(engine.conduct_audit(&at, 1, good.clone()).unwrap().audit_id, 1);
    assert_eq!(engine.conduct_audit(&at, 2, good).unwrap().audit_id, 2);
    assert_eq!(engine.get_next_accommodation_id(), Some(3));
    assert_eq!(engine.get_next_audit_id(), Some(3));
    assert_eq!(engine.list_audits(1).len(), 1);
}
