use basalt_core::{
    db::{
        DeleteRequest, EntityRead, HistoryWindow, ProtectionReason, ReadError, RedirectRequest,
        RedirectRevertRequest, RedirectViolation, WriteError, WriteRequest,
        meta::{DeleteType, EditKind, ProtectionFlags},
    },
    test_support::{TestHarness, assert_store_invariants, item_body},
    types::RevisionId,
};

fn delete_request(external: &str, delete_type: DeleteType) -> DeleteRequest {
    DeleteRequest {
        external_id: TestHarness::id(external),
        delete_type,
        reason: "cleanup".to_string(),
        actor: "admin".to_string(),
        approved_by: Some("steward".to_string()),
        retention_expiry: None,
    }
}

// -- deletion ------------------------------------------------------------

#[test]
fn hard_delete_makes_reads_gone_but_keeps_history() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");
    harness.write_labeled("Q42", "B");

    let outcome = harness
        .store
        .delete_entity(delete_request("Q42", DeleteType::Hard))
        .expect("hard delete");
    assert_eq!(outcome.revision_id, RevisionId::new(3));

    let id = TestHarness::id("Q42");
    assert!(matches!(
        harness.store.get_entity(&id),
        Err(ReadError::Gone(_))
    ));

    // History still lists every revision, tombstone included.
    let history = harness
        .store
        .get_history(&id, HistoryWindow::default())
        .expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].edit_kind, EditKind::HardDelete);

    // The tombstone preserved the deleted body and carries the audit trail.
    let tombstone = harness
        .store
        .get_revision(&id, RevisionId::new(3))
        .expect("tombstone revision");
    assert!(tombstone.is_deleted);
    assert_eq!(tombstone.deletion_reason.as_deref(), Some("cleanup"));
    assert_eq!(tombstone.entity["labels"]["en"]["value"], "B");

    let audits = harness.store.delete_audits(&id).expect("audits");
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].delete_type, DeleteType::Hard);
    assert_eq!(audits[0].approved_by.as_deref(), Some("steward"));

    assert_store_invariants(&harness);
}

#[test]
fn hard_deleted_entities_reject_all_further_writes() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");
    harness
        .store
        .delete_entity(delete_request("Q42", DeleteType::Hard))
        .expect("hard delete");

    let err = harness
        .store
        .put_entity(WriteRequest::edit(
            TestHarness::id("Q42"),
            item_body("Q42", "resurrection attempt"),
            "tester",
        ))
        .expect_err("writes to a hard-deleted entity are rejected");
    assert!(matches!(
        err,
        WriteError::ProtectionDenied(ProtectionReason::Deleted)
    ));

    // Not even the undelete path can bring it back.
    assert!(matches!(
        harness
            .store
            .undelete_entity(TestHarness::id("Q42"), "admin"),
        Err(WriteError::Gone(_))
    ));
}

#[test]
fn soft_delete_stays_readable_and_undeletes() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");

    harness
        .store
        .delete_entity(delete_request("Q42", DeleteType::Soft))
        .expect("soft delete");

    // Soft deletion does not flip the head flag; reads still serve the
    // tombstone envelope.
    let id = TestHarness::id("Q42");
    match harness.store.get_entity(&id).expect("read") {
        EntityRead::Entity { envelope, .. } => {
            assert!(envelope.is_deleted);
            assert_eq!(envelope.entity["labels"]["en"]["value"], "A");
        }
        EntityRead::RedirectsTo { .. } => panic!("not a redirect"),
    }
    let audits = harness.store.delete_audits(&id).expect("audits");
    assert_eq!(audits[0].delete_type, DeleteType::Soft);

    let outcome = harness
        .store
        .undelete_entity(id.clone(), "admin")
        .expect("undelete");
    assert_eq!(outcome.revision_id, RevisionId::new(3));

    match harness.store.get_entity(&id).expect("read after undelete") {
        EntityRead::Entity { envelope, .. } => {
            assert!(!envelope.is_deleted);
            assert_eq!(envelope.entity["labels"]["en"]["value"], "A");
        }
        EntityRead::RedirectsTo { .. } => panic!("not a redirect"),
    }

    assert_store_invariants(&harness);
}

#[test]
fn undelete_requires_a_soft_deleted_head() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");

    assert!(matches!(
        harness.store.undelete_entity(TestHarness::id("Q42"), "admin"),
        Err(WriteError::WriteFailed(_))
    ));
}

// -- redirects -----------------------------------------------------------

#[test]
fn redirect_then_revert_restores_the_named_revision() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "target");
    harness.write_labeled("Q59", "one");
    harness.write_labeled("Q59", "two");
    harness.write_labeled("Q59", "three");

    let q59 = TestHarness::id("Q59");
    let outcome = harness
        .store
        .create_redirect(RedirectRequest {
            source: q59.clone(),
            target: TestHarness::id("Q42"),
            actor: "editor".to_string(),
        })
        .expect("redirect");
    assert_eq!(outcome.revision_id, RevisionId::new(4));

    match harness.store.get_entity(&q59).expect("read") {
        EntityRead::RedirectsTo { target } => assert_eq!(target, TestHarness::id("Q42")),
        EntityRead::Entity { .. } => panic!("Q59 must read as a redirect"),
    }
    assert_eq!(
        harness
            .store
            .incoming_redirects(&TestHarness::id("Q42"))
            .expect("incoming"),
        vec![q59.clone()]
    );

    // Following the single permitted hop lands on the target entity.
    match harness
        .store
        .get_entity_following_redirect(&q59)
        .expect("follow")
    {
        EntityRead::Entity { envelope, .. } => {
            assert_eq!(envelope.entity["labels"]["en"]["value"], "target");
        }
        EntityRead::RedirectsTo { .. } => panic!("hop must resolve"),
    }

    // The tombstone revision is empty-bodied with the redirect pointer.
    let tombstone = harness
        .store
        .get_revision(&q59, RevisionId::new(4))
        .expect("tombstone");
    assert_eq!(tombstone.redirects_to, Some(TestHarness::id("Q42")));
    assert_eq!(tombstone.entity, serde_json::json!({}));

    let restored = harness
        .store
        .revert_redirect(RedirectRevertRequest {
            source: q59.clone(),
            restore_to_revision: RevisionId::new(3),
            actor: "editor".to_string(),
        })
        .expect("revert");
    assert_eq!(restored.revision_id, RevisionId::new(5));

    match harness.store.get_entity(&q59).expect("read after revert") {
        EntityRead::Entity { envelope, .. } => {
            assert_eq!(envelope.entity["labels"]["en"]["value"], "three");
            assert_eq!(envelope.redirects_to, None);
        }
        EntityRead::RedirectsTo { .. } => panic!("revert must clear the redirect"),
    }
    assert!(
        harness
            .store
            .incoming_redirects(&TestHarness::id("Q42"))
            .expect("incoming")
            .is_empty(),
        "the relation row is dropped with the revert"
    );

    assert_store_invariants(&harness);
}

#[test]
fn redirect_validations_reject_self_chain_and_cycle() {
    let harness = TestHarness::new();
    harness.write_labeled("Q1", "a");
    harness.write_labeled("Q2", "b");
    harness.write_labeled("Q3", "c");

    let redirect = |source: &str, target: &str| {
        harness.store.create_redirect(RedirectRequest {
            source: TestHarness::id(source),
            target: TestHarness::id(target),
            actor: "editor".to_string(),
        })
    };

    assert!(matches!(
        redirect("Q1", "Q1"),
        Err(WriteError::InvalidRedirect(RedirectViolation::SelfTarget))
    ));

    redirect("Q2", "Q3").expect("valid redirect");

    // Chains: Q1 -> Q2 -> Q3 is rejected at creation.
    assert!(matches!(
        redirect("Q1", "Q2"),
        Err(WriteError::InvalidRedirect(RedirectViolation::Chain))
    ));

    // Cycles: Q3 -> Q2 would close Q2 -> Q3 -> Q2.
    assert!(matches!(
        redirect("Q3", "Q2"),
        Err(WriteError::InvalidRedirect(RedirectViolation::Cycle))
    ));

    // Unresolvable and deleted targets are refused as well.
    assert!(matches!(
        redirect("Q1", "Q404"),
        Err(WriteError::EntityNotFound(_))
    ));
    harness
        .store
        .delete_entity(delete_request("Q3", DeleteType::Hard))
        .expect("hard delete");
    assert!(matches!(redirect("Q1", "Q3"), Err(WriteError::Gone(_))));
}

// -- protection ----------------------------------------------------------

#[test]
fn protection_rejections_follow_flag_priority() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");

    // A flag-setting write travels with a normal revision.
    harness
        .store
        .put_entity(WriteRequest {
            external_id: TestHarness::id("Q42"),
            entity: item_body("Q42", "B"),
            edit_type: "protect".to_string(),
            actor: "admin".to_string(),
            is_mass_edit: false,
            is_not_autoconfirmed_user: false,
            flags: Some(ProtectionFlags {
                is_semi_protected: true,
                is_mass_edit_protected: true,
                ..ProtectionFlags::default()
            }),
        })
        .expect("flag write");

    // Highest-priority active flag decides: mass-edit protection outranks
    // semi-protection for a mass edit by a non-autoconfirmed user.
    let err = harness
        .store
        .put_entity(WriteRequest {
            external_id: TestHarness::id("Q42"),
            entity: item_body("Q42", "C"),
            edit_type: "edit_entity".to_string(),
            actor: "bot".to_string(),
            is_mass_edit: true,
            is_not_autoconfirmed_user: true,
            flags: None,
        })
        .expect_err("protected edit");
    assert!(matches!(
        err,
        WriteError::ProtectionDenied(ProtectionReason::MassEditProtected)
    ));

    // The same user passes once the edit is not a mass edit only if they
    // are autoconfirmed; semi-protection still holds otherwise.
    let err = harness
        .store
        .put_entity(WriteRequest {
            external_id: TestHarness::id("Q42"),
            entity: item_body("Q42", "C"),
            edit_type: "edit_entity".to_string(),
            actor: "newcomer".to_string(),
            is_mass_edit: false,
            is_not_autoconfirmed_user: true,
            flags: None,
        })
        .expect_err("semi-protected edit");
    assert!(matches!(
        err,
        WriteError::ProtectionDenied(ProtectionReason::SemiProtected)
    ));

    // An autoconfirmed, non-mass edit goes through and the flags persist.
    harness
        .store
        .put_entity(WriteRequest::edit(
            TestHarness::id("Q42"),
            item_body("Q42", "C"),
            "regular",
        ))
        .expect("allowed edit");
}
