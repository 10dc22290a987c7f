use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use rusqlite::params;

use blood_request_cell::models::{
    BloodRequestError, BloodRequestQuery, CreateBloodRequest, ItemPayload, ItemStatus,
    RecipientData, RequestStatus, UpdateBloodRequest, Urgency,
};
use blood_request_cell::services::{BloodRequestLifecycleService, BloodRequestQueryService};
use shared_database::Database;
use shared_utils::scope::Scope;
use shared_utils::test_utils::Fixtures;

struct World {
    db: Database,
    hospital_id: i64,
    other_hospital_id: i64,
    a_pos: i64,
    o_neg: i64,
}

fn world() -> World {
    let db = Database::open_in_memory().unwrap();
    let (hospital_id, _) = Fixtures::hospital(db.conn(), "St. Mary's");
    let (other_hospital_id, _) = Fixtures::hospital(db.conn(), "General Hospital");
    let a_pos = Fixtures::blood_group_id(db.conn(), "A+");
    let o_neg = Fixtures::blood_group_id(db.conn(), "O-");
    World { db, hospital_id, other_hospital_id, a_pos, o_neg }
}

fn general_item(blood_group_id: i64, units: i64, urgency: &str) -> ItemPayload {
    ItemPayload {
        blood_group_id: Some(blood_group_id),
        units_requested: Some(units),
        urgency: Some(urgency.to_string()),
        ..Default::default()
    }
}

fn new_recipient_item(blood_group_id: i64, name: &str) -> ItemPayload {
    ItemPayload {
        recipient_data: Some(RecipientData {
            name: Some(name.to_string()),
            gender: Some("female".to_string()),
            ..Default::default()
        }),
        ..general_item(blood_group_id, 1, "normal")
    }
}

fn create_payload(items: Vec<ItemPayload>) -> CreateBloodRequest {
    CreateBloodRequest {
        hospital_id: None,
        request_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        notes: Some("Ward 4".to_string()),
        items,
    }
}

fn count(db: &Database, table: &str) -> i64 {
    db.conn()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

fn request_status(db: &Database, id: i64) -> RequestStatus {
    db.conn()
        .query_row("SELECT status FROM blood_requests WHERE id = ?1", [id], |row| row.get(0))
        .unwrap()
}

/// Passed donation of `blood_group_id` credited to an item.
fn credit_item(db: &Database, item_id: i64, blood_group_id: i64) -> i64 {
    let conn = db.conn();
    let email = format!("donor{}@bloodbank.test", item_id);
    let donor_id = Fixtures::donor(conn, &email, "A+", Fixtures::adult_birth_date());
    let (center_id, _) = Fixtures::blood_center(conn, &format!("Center {}", item_id));
    let now = Utc::now();
    conn.execute(
        "INSERT INTO donations (user_id, blood_center_id, blood_group_id, volume_ml, weight,
                                donation_date_time, screening_status, blood_request_item_id,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, 450, 70.0, ?4, 'passed', ?5, ?4, ?4)",
        params![donor_id, center_id, blood_group_id, now, item_id],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn donation_item(db: &Database, donation_id: i64) -> Option<i64> {
    db.conn()
        .query_row(
            "SELECT blood_request_item_id FROM donations WHERE id = ?1",
            [donation_id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn test_create_round_trip_with_general_and_new_recipient_items() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();

    let detail = service
        .create_with_items(
            &mut w.db,
            &scope,
            create_payload(vec![
                general_item(w.a_pos, 2, "urgent"),
                new_recipient_item(w.o_neg, "Jane Roe"),
            ]),
        )
        .unwrap();

    assert_eq!(detail.request.hospital_id, w.hospital_id);
    assert_eq!(detail.request.status, RequestStatus::Pending);
    assert!(detail.can_edit);
    assert!(detail.can_delete);
    assert_eq!(detail.items.len(), 2);

    let general = &detail.items[0];
    assert!(general.is_general);
    assert_eq!(general.recipient_id, None);
    assert_eq!(general.blood_group, "A+");
    assert_eq!(general.units_requested, 2);
    assert_eq!(general.units_fulfilled, 0);
    assert_eq!(general.urgency, Urgency::Urgent);
    assert!(general.unique_code.starts_with("BRI-"));

    let linked = &detail.items[1];
    assert!(!linked.is_general);
    assert_eq!(linked.recipient_name.as_deref(), Some("Jane Roe"));

    let (recipient_hospital, recipient_group): (i64, i64) = w
        .db
        .conn()
        .query_row(
            "SELECT hospital_id, blood_group_id FROM recipients WHERE id = ?1",
            [linked.recipient_id.unwrap()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(recipient_hospital, w.hospital_id);
    assert_eq!(recipient_group, w.o_neg);
}

#[test]
fn test_create_rolls_back_everything_when_an_item_insert_fails() {
    let mut w = world();
    w.db.conn()
        .execute_batch(
            "CREATE TRIGGER fail_second_item BEFORE INSERT ON blood_request_items
             WHEN (SELECT COUNT(*) FROM blood_request_items
                    WHERE blood_request_id = NEW.blood_request_id) >= 1
             BEGIN SELECT RAISE(ABORT, 'simulated item failure'); END;",
        )
        .unwrap();

    let result = BloodRequestLifecycleService::new().create_with_items(
        &mut w.db,
        &Scope::Hospital(w.hospital_id),
        create_payload(vec![
            new_recipient_item(w.o_neg, "Jane Roe"),
            new_recipient_item(w.a_pos, "John Roe"),
        ]),
    );

    assert_matches!(result, Err(BloodRequestError::Database(_)));
    assert_eq!(count(&w.db, "blood_requests"), 0);
    assert_eq!(count(&w.db, "blood_request_items"), 0);
    assert_eq!(count(&w.db, "recipients"), 0);
}

#[test]
fn test_invalid_item_rejects_whole_create() {
    let mut w = world();

    let err = BloodRequestLifecycleService::new()
        .create_with_items(
            &mut w.db,
            &Scope::Hospital(w.hospital_id),
            create_payload(vec![general_item(w.a_pos, 1, "low"), general_item(w.a_pos, 0, "low")]),
        )
        .unwrap_err();

    match err {
        BloodRequestError::Validation(errors) => {
            assert!(errors.contains("items.1.units_requested"));
            assert!(!errors.contains("items.0.units_requested"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(count(&w.db, "blood_requests"), 0);
}

#[test]
fn test_recipient_of_another_hospital_is_rejected() {
    let mut w = world();
    let foreign = Fixtures::recipient(w.db.conn(), w.other_hospital_id, "Foreign Patient", "A+");

    let mut item = general_item(w.a_pos, 1, "normal");
    item.recipient_id = Some(foreign);

    let err = BloodRequestLifecycleService::new()
        .create_with_items(&mut w.db, &Scope::Hospital(w.hospital_id), create_payload(vec![item]))
        .unwrap_err();

    assert_matches!(err, BloodRequestError::Validation(ref errors) if errors.contains("items.0.recipient_id"));
}

#[test]
fn test_system_user_must_name_existing_hospital() {
    let mut w = world();
    let service = BloodRequestLifecycleService::new();

    let err = service
        .create_with_items(&mut w.db, &Scope::System, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap_err();
    assert_matches!(err, BloodRequestError::Validation(ref errors) if errors.contains("hospital_id"));

    let mut payload = create_payload(vec![general_item(w.a_pos, 1, "low")]);
    payload.hospital_id = Some(w.other_hospital_id);
    let detail = service.create_with_items(&mut w.db, &Scope::System, payload).unwrap();
    assert_eq!(detail.request.hospital_id, w.other_hospital_id);
}

#[test]
fn test_update_replaces_item_set() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(
            &mut w.db,
            &scope,
            create_payload(vec![general_item(w.a_pos, 2, "urgent"), general_item(w.o_neg, 1, "low")]),
        )
        .unwrap();
    let kept = created.items[0].clone();
    let removed = created.items[1].clone();

    let mut changed = general_item(w.a_pos, 4, "normal");
    changed.id = Some(kept.id);
    let updated = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest {
                request_date: None,
                notes: Some("Theatre 2".to_string()),
                items: vec![changed, new_recipient_item(w.o_neg, "Jane Roe")],
            },
        )
        .unwrap();

    assert_eq!(updated.request.notes.as_deref(), Some("Theatre 2"));
    assert_eq!(updated.request.request_date, created.request.request_date);
    assert_eq!(updated.items.len(), 2);
    assert_eq!(updated.items[0].id, kept.id);
    assert_eq!(updated.items[0].unique_code, kept.unique_code);
    assert_eq!(updated.items[0].units_requested, 4);
    assert_eq!(updated.items[0].urgency, Urgency::Normal);
    assert!(updated.items.iter().all(|i| i.id != removed.id));
    assert_eq!(updated.items[1].recipient_name.as_deref(), Some("Jane Roe"));
}

#[test]
fn test_failed_update_leaves_request_untouched() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 2, "urgent")]))
        .unwrap();

    let mut stranger = general_item(w.a_pos, 1, "low");
    stranger.id = Some(9999);
    let err = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest {
                request_date: None,
                notes: Some("changed".to_string()),
                items: vec![general_item(w.o_neg, 3, "low"), stranger],
            },
        )
        .unwrap_err();
    assert_matches!(err, BloodRequestError::Validation(ref errors) if errors.contains("items.1.id"));

    let detail = BloodRequestQueryService::new()
        .show(w.db.conn(), &scope, created.request.id)
        .unwrap();
    assert_eq!(detail.request.notes.as_deref(), Some("Ward 4"));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].id, created.items[0].id);
}

#[test]
fn test_terminal_requests_cannot_be_edited() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();

    let fulfilled = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap();
    let item_id = fulfilled.items[0].id;
    let detail = service
        .set_item_status(&mut w.db, &Scope::System, fulfilled.request.id, item_id, ItemStatus::Fulfilled)
        .unwrap();
    assert_eq!(detail.request.status, RequestStatus::Fulfilled);
    assert!(!detail.can_edit);

    let cancelled = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap();
    let detail = service.cancel(&mut w.db, &scope, cancelled.request.id).unwrap();
    assert_eq!(detail.request.status, RequestStatus::Cancelled);
    assert_eq!(detail.items[0].status, ItemStatus::Cancelled);

    let queries = BloodRequestQueryService::new();
    for id in [fulfilled.request.id, cancelled.request.id] {
        let before = queries.show(w.db.conn(), &scope, id).unwrap();
        let err = service
            .update_with_items(
                &mut w.db,
                &scope,
                id,
                UpdateBloodRequest {
                    items: vec![general_item(w.o_neg, 5, "urgent")],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_state_error());
        assert_matches!(err, BloodRequestError::InvalidState { action: "edit", .. });

        let after = queries.show(w.db.conn(), &scope, id).unwrap();
        assert_eq!(after.request.status, before.request.status);
        assert_eq!(after.request.notes, before.request.notes);
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].id, before.items[0].id);
        assert_eq!(after.items[0].blood_group_id, w.a_pos);
        assert_eq!(after.items[0].units_requested, 1);
        assert_eq!(after.items[0].status, before.items[0].status);
    }
    assert_eq!(count(&w.db, "blood_request_items"), 2);
}

#[test]
fn test_delete_is_state_gated() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();

    let approved = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap();
    service.approve(&mut w.db, &Scope::System, approved.request.id).unwrap();
    assert_eq!(request_status(&w.db, approved.request.id), RequestStatus::Approved);

    let err = service.delete(&mut w.db, &scope, approved.request.id).unwrap_err();
    assert_matches!(err, BloodRequestError::InvalidState { action: "delete", status: RequestStatus::Approved });
    assert_eq!(count(&w.db, "blood_requests"), 1);

    let pending = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap();
    service.delete(&mut w.db, &scope, pending.request.id).unwrap();
    assert_eq!(count(&w.db, "blood_requests"), 1);
    assert_eq!(count(&w.db, "blood_request_items"), 1);

    service.cancel(&mut w.db, &scope, approved.request.id).unwrap();
    service.delete(&mut w.db, &scope, approved.request.id).unwrap();
    assert_eq!(count(&w.db, "blood_requests"), 0);
    assert_eq!(count(&w.db, "blood_request_items"), 0);
}

#[test]
fn test_foreign_hospital_staff_cannot_mutate() {
    let mut w = world();
    let owner = Scope::Hospital(w.hospital_id);
    let intruder = Scope::Hospital(w.other_hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(&mut w.db, &owner, create_payload(vec![general_item(w.a_pos, 2, "urgent")]))
        .unwrap();
    let id = created.request.id;

    let update = service.update_with_items(
        &mut w.db,
        &intruder,
        id,
        UpdateBloodRequest {
            notes: Some("hijacked".to_string()),
            items: vec![general_item(w.o_neg, 9, "low")],
            ..Default::default()
        },
    );
    assert_matches!(update, Err(BloodRequestError::Forbidden));
    assert_matches!(service.delete(&mut w.db, &intruder, id), Err(BloodRequestError::Forbidden));
    assert_matches!(service.cancel(&mut w.db, &intruder, id), Err(BloodRequestError::Forbidden));
    assert_matches!(
        BloodRequestQueryService::new().show(w.db.conn(), &intruder, id),
        Err(BloodRequestError::Forbidden)
    );

    let mut payload = create_payload(vec![general_item(w.a_pos, 1, "low")]);
    payload.hospital_id = Some(w.hospital_id);
    assert_matches!(
        service.create_with_items(&mut w.db, &intruder, payload),
        Err(BloodRequestError::Forbidden)
    );

    let detail = BloodRequestQueryService::new().show(w.db.conn(), &owner, id).unwrap();
    assert_eq!(detail.request.notes.as_deref(), Some("Ward 4"));
    assert_eq!(detail.request.status, RequestStatus::Pending);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].units_requested, 2);
    assert_eq!(count(&w.db, "blood_requests"), 1);
}

#[test]
fn test_approve_and_item_status_are_system_only() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 1, "low")]))
        .unwrap();

    assert_matches!(
        service.approve(&mut w.db, &scope, created.request.id),
        Err(BloodRequestError::Forbidden)
    );
    assert_matches!(
        service.set_item_status(&mut w.db, &scope, created.request.id, created.items[0].id, ItemStatus::Approved),
        Err(BloodRequestError::Forbidden)
    );
    assert_eq!(request_status(&w.db, created.request.id), RequestStatus::Pending);
}

#[test]
fn test_partial_status_and_locked_items() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(
            &mut w.db,
            &scope,
            create_payload(vec![general_item(w.a_pos, 1, "urgent"), general_item(w.o_neg, 2, "low")]),
        )
        .unwrap();
    let (first, second) = (created.items[0].clone(), created.items[1].clone());

    let detail = service
        .set_item_status(&mut w.db, &Scope::System, created.request.id, first.id, ItemStatus::Fulfilled)
        .unwrap();
    assert_eq!(detail.request.status, RequestStatus::Partial);
    assert!(detail.can_edit);
    assert!(!detail.can_delete);

    let err = service
        .set_item_status(&mut w.db, &Scope::System, created.request.id, first.id, ItemStatus::Cancelled)
        .unwrap_err();
    assert_matches!(
        err,
        BloodRequestError::InvalidItemTransition { from: ItemStatus::Fulfilled, to: ItemStatus::Cancelled }
    );

    let mut touch_fulfilled = general_item(w.a_pos, 5, "urgent");
    touch_fulfilled.id = Some(first.id);
    let mut keep_second = general_item(w.o_neg, 2, "low");
    keep_second.id = Some(second.id);
    let err = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![touch_fulfilled, keep_second.clone()], ..Default::default() },
        )
        .unwrap_err();
    assert_matches!(err, BloodRequestError::ItemLocked { status: ItemStatus::Fulfilled, .. });

    let err = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![keep_second.clone()], ..Default::default() },
        )
        .unwrap_err();
    assert_matches!(err, BloodRequestError::ItemLocked { .. });

    let mut unchanged_first = general_item(w.a_pos, 1, "urgent");
    unchanged_first.id = Some(first.id);
    keep_second.units_requested = Some(3);
    let detail = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![unchanged_first, keep_second], ..Default::default() },
        )
        .unwrap();
    assert_eq!(detail.items[0].status, ItemStatus::Fulfilled);
    assert_eq!(detail.items[1].units_requested, 3);
    assert_eq!(detail.request.status, RequestStatus::Partial);

    let detail = service.approve(&mut w.db, &Scope::System, created.request.id).unwrap();
    assert_eq!(detail.items[1].status, ItemStatus::Approved);
    assert_eq!(detail.request.status, RequestStatus::Partial);
}

#[test]
fn test_credited_item_keeps_its_blood_group() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 3, "urgent")]))
        .unwrap();
    let item_id = created.items[0].id;
    service.approve(&mut w.db, &Scope::System, created.request.id).unwrap();
    credit_item(&w.db, item_id, w.a_pos);

    let mut regrouped = general_item(w.o_neg, 3, "urgent");
    regrouped.id = Some(item_id);
    let err = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![regrouped], ..Default::default() },
        )
        .unwrap_err();
    assert!(err.is_state_error());
    assert_matches!(err, BloodRequestError::ItemHasDonations { donations: 1, .. });

    let mut more_units = general_item(w.a_pos, 4, "urgent");
    more_units.id = Some(item_id);
    let detail = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![more_units], ..Default::default() },
        )
        .unwrap();
    assert_eq!(detail.items[0].blood_group_id, w.a_pos);
    assert_eq!(detail.items[0].units_requested, 4);
    assert_eq!(detail.items[0].units_fulfilled, 1);
    assert_eq!(detail.items[0].status, ItemStatus::Approved);
}

#[test]
fn test_credited_item_cannot_be_dropped_from_update() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(
            &mut w.db,
            &scope,
            create_payload(vec![general_item(w.a_pos, 3, "urgent"), general_item(w.o_neg, 1, "low")]),
        )
        .unwrap();
    service.approve(&mut w.db, &Scope::System, created.request.id).unwrap();
    let donation_id = credit_item(&w.db, created.items[0].id, w.a_pos);

    let mut keep_second = general_item(w.o_neg, 1, "low");
    keep_second.id = Some(created.items[1].id);
    let err = service
        .update_with_items(
            &mut w.db,
            &scope,
            created.request.id,
            UpdateBloodRequest { items: vec![keep_second], ..Default::default() },
        )
        .unwrap_err();

    assert_matches!(err, BloodRequestError::ItemHasDonations { ref code, .. } if *code == created.items[0].unique_code);
    assert_eq!(count(&w.db, "blood_request_items"), 2);
    assert_eq!(donation_item(&w.db, donation_id), Some(created.items[0].id));
}

#[test]
fn test_request_with_credited_items_cannot_be_deleted() {
    let mut w = world();
    let scope = Scope::Hospital(w.hospital_id);
    let service = BloodRequestLifecycleService::new();
    let created = service
        .create_with_items(&mut w.db, &scope, create_payload(vec![general_item(w.a_pos, 3, "urgent")]))
        .unwrap();
    service.approve(&mut w.db, &Scope::System, created.request.id).unwrap();
    let donation_id = credit_item(&w.db, created.items[0].id, w.a_pos);
    let detail = service.cancel(&mut w.db, &scope, created.request.id).unwrap();
    assert_eq!(detail.request.status, RequestStatus::Cancelled);

    let err = service.delete(&mut w.db, &scope, created.request.id).unwrap_err();
    assert!(err.is_state_error());
    assert_matches!(err, BloodRequestError::ItemHasDonations { .. });
    assert_eq!(count(&w.db, "blood_requests"), 1);
    assert_eq!(count(&w.db, "blood_request_items"), 1);
    assert_eq!(donation_item(&w.db, donation_id), Some(created.items[0].id));
}

#[test]
fn test_list_is_scoped_and_filtered() {
    let mut w = world();
    let service = BloodRequestLifecycleService::new();
    service
        .create_with_items(
            &mut w.db,
            &Scope::Hospital(w.hospital_id),
            create_payload(vec![general_item(w.a_pos, 2, "urgent"), general_item(w.o_neg, 1, "low")]),
        )
        .unwrap();
    service
        .create_with_items(
            &mut w.db,
            &Scope::Hospital(w.hospital_id),
            create_payload(vec![general_item(w.a_pos, 1, "normal")]),
        )
        .unwrap();
    service
        .create_with_items(
            &mut w.db,
            &Scope::Hospital(w.other_hospital_id),
            create_payload(vec![general_item(w.a_pos, 1, "urgent")]),
        )
        .unwrap();

    let queries = BloodRequestQueryService::new();
    let all = queries.list(w.db.conn(), &Scope::System, &BloodRequestQuery::default()).unwrap();
    assert_eq!(all.meta.total, 3);
    assert_eq!(all.meta.per_page, 10);

    let own = queries
        .list(w.db.conn(), &Scope::Hospital(w.hospital_id), &BloodRequestQuery::default())
        .unwrap();
    assert_eq!(own.meta.total, 2);
    assert!(own.data.iter().all(|r| r.request.hospital_id == w.hospital_id));

    let urgent = queries
        .list(
            w.db.conn(),
            &Scope::Hospital(w.hospital_id),
            &BloodRequestQuery { urgency: Some(Urgency::Urgent), ..Default::default() },
        )
        .unwrap();
    assert_eq!(urgent.data.len(), 1);
    assert_eq!(urgent.data[0].items_count, 2);
    assert_eq!(urgent.data[0].total_units, 3);
    assert!(urgent.data[0].has_urgent);

    let searched = queries
        .list(
            w.db.conn(),
            &Scope::System,
            &BloodRequestQuery { search: Some("general".to_string()), ..Default::default() },
        )
        .unwrap();
    assert_eq!(searched.meta.total, 1);
    assert_eq!(searched.data[0].request.hospital_name, "General Hospital");

    assert_matches!(
        queries.list(w.db.conn(), &Scope::Donor(1), &BloodRequestQuery::default()),
        Err(BloodRequestError::Forbidden)
    );
}
