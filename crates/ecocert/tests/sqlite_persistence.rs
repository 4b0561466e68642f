//! State survives reopening a SQLite-backed engine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use ecocert::{
    AuditScores, CallContext, CertificationEngine, CertificationLevel, EngineConfig,
    NewAccommodation, NewAudit, Principal, StorageConfig,
};

#[test]
fn sqlite_persistence_across_connections() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("state").join("ecocert.db");

    let owner = Principal::new("SP0OWNER").unwrap();
    let host = Principal::new("SP1HOST").unwrap();
    let auditor = Principal::new("SP2AUDIT").unwrap();
    let config = EngineConfig {
        storage: StorageConfig {
            path: Some(path.clone()),
        },
        ..EngineConfig::new(owner.clone()).with_validity_period(50)
    };

    {
        let engine = CertificationEngine::open(&config).expect("open");
        engine
            .authorize_auditor(&CallContext::new(owner, 1), &auditor, "water")
            .unwrap();
        let id = engine
            .register(
                &CallContext::new(host.clone(), 2),
                NewAccommodation {
                    name: "Fjord Cabins".to_string(),
                    location: "Geiranger".to_string(),
                    category: "cabin".to_string(),
                    capacity: 6,
                },
            )
            .unwrap();
        let at = CallContext::new(auditor.clone(), 3);
        let audit = engine
            .conduct_audit(
                &at,
                id,
                NewAudit {
                    audit_type: "initial".to_string(),
                    scores: AuditScores {
                        energy: 60,
                        water: 60,
                        waste: 60,
                    },
                    compliance_issues: 3,
                    recommendations: String::new(),
                },
            )
            .unwrap();
        engine.issue_certification(&at, id, audit.audit_id).unwrap();
    }

    // Reopen from the same path.
    {
        let engine = CertificationEngine::open(&config).expect("reopen");
        assert!(engine.is_owner(1, &host));
        assert!(engine.is_authorized_auditor(&auditor));
        assert_eq!(engine.get_next_accommodation_id(), Some(2));
        assert_eq!(engine.get_next_audit_id(), Some(2));
        assert_eq!(
            engine.get_certification_level(1, 52),
            Some(CertificationLevel::Bronze)
        );
        assert_eq!(engine.get_certification_level(1, 53), None);
        assert!(engine.get_audit_record(1).unwrap().is_passed);
        assert!(engine.verify_audit_chain().unwrap());
    }
}
