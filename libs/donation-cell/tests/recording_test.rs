use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, Utc};

use appointment_cell::models::AppointmentStatus;
use appointment_cell::repository as appointments;
use blood_request_cell::models::{CreateBloodRequest, ItemPayload, ItemStatus, RequestStatus};
use blood_request_cell::services::{BloodRequestLifecycleService, BloodRequestQueryService};
use donation_cell::models::{CreateDonation, DonationError, ScreeningStatus, UpdateDonation};
use donation_cell::services::DonationService;
use shared_database::Database;
use shared_utils::scope::Scope;
use shared_utils::test_utils::Fixtures;

struct World {
    db: Database,
    hospital_id: i64,
    center_id: i64,
    other_center_id: i64,
    donor_id: i64,
    o_pos_donor_id: i64,
    a_pos: i64,
}

fn world() -> World {
    let db = Database::open_in_memory().unwrap();
    let (hospital_id, _) = Fixtures::hospital(db.conn(), "St. Mary's");
    let (center_id, _) = Fixtures::blood_center(db.conn(), "Central Center");
    let (other_center_id, _) = Fixtures::blood_center(db.conn(), "North Center");
    let donor_id = Fixtures::donor(db.conn(), "ana@bloodbank.test", "A+", Fixtures::adult_birth_date());
    let o_pos_donor_id = Fixtures::donor(db.conn(), "oscar@bloodbank.test", "O+", Fixtures::adult_birth_date());
    let a_pos = Fixtures::blood_group_id(db.conn(), "A+");
    World { db, hospital_id, center_id, other_center_id, donor_id, o_pos_donor_id, a_pos }
}

impl World {
    /// Request with one general A+ item; returns `(request_id, item_id)`.
    fn open_request(&mut self, units: i64) -> (i64, i64) {
        let detail = BloodRequestLifecycleService::new()
            .create_with_items(
                &mut self.db,
                &Scope::Hospital(self.hospital_id),
                CreateBloodRequest {
                    request_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                    items: vec![ItemPayload {
                        blood_group_id: Some(self.a_pos),
                        units_requested: Some(units),
                        urgency: Some("urgent".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        (detail.request.id, detail.items[0].id)
    }

    fn appointment(&self, user_id: i64) -> i64 {
        let now = Utc::now();
        appointments::insert_appointment(self.db.conn(), user_id, self.center_id, now + Duration::days(1), None, now)
            .unwrap()
    }

    fn donation(&self, item_id: Option<i64>, screening: ScreeningStatus) -> CreateDonation {
        CreateDonation {
            user_id: Some(self.donor_id),
            blood_request_item_id: item_id,
            volume_ml: Some(450),
            weight: Some(70.0),
            screening_status: Some(screening),
            ..Default::default()
        }
    }

    fn item_status(&self, request_id: i64) -> (ItemStatus, i64, RequestStatus) {
        let detail = BloodRequestQueryService::new()
            .show(self.db.conn(), &Scope::System, request_id)
            .unwrap();
        (detail.items[0].status, detail.items[0].units_fulfilled, detail.request.status)
    }
}

#[test]
fn test_passed_donations_fulfil_item_and_complete_appointment() {
    let mut w = world();
    let (request_id, item_id) = w.open_request(2);
    let appointment_id = w.appointment(w.donor_id);
    let center = Scope::BloodCenter(w.center_id);
    let service = DonationService::new();

    let mut payload = w.donation(Some(item_id), ScreeningStatus::Passed);
    payload.appointment_id = Some(appointment_id);
    let first = service.create(&mut w.db, &center, payload).unwrap();
    assert_eq!(first.blood_center_id, w.center_id);
    assert_eq!(first.blood_group, "A+");
    assert!(first.item_code.as_deref().unwrap().starts_with("BRI-"));

    let appointment = appointments::find_appointment_ref(w.db.conn(), appointment_id).unwrap().unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Completed);
    assert_eq!(w.item_status(request_id), (ItemStatus::Approved, 1, RequestStatus::Approved));

    let payload = w.donation(Some(item_id), ScreeningStatus::Passed);
    let second = service
        .create(&mut w.db, &center, payload)
        .unwrap();
    assert_eq!(w.item_status(request_id), (ItemStatus::Fulfilled, 2, RequestStatus::Fulfilled));

    service
        .update(
            &mut w.db,
            &center,
            second.id,
            UpdateDonation { screening_status: Some(ScreeningStatus::Failed), ..Default::default() },
        )
        .unwrap();
    assert_eq!(w.item_status(request_id), (ItemStatus::Approved, 1, RequestStatus::Approved));

    service.delete(&mut w.db, &center, first.id).unwrap();
    assert_eq!(w.item_status(request_id), (ItemStatus::Approved, 0, RequestStatus::Approved));
}

#[test]
fn test_unscreened_donation_does_not_count() {
    let mut w = world();
    let (request_id, item_id) = w.open_request(1);

    let payload = {
        let mut payload = w.donation(Some(item_id), ScreeningStatus::NotScreened);
        payload.blood_center_id = Some(w.center_id);
        payload
    };
    DonationService::new()
        .create(&mut w.db, &Scope::System, payload)
        .unwrap();

    assert_eq!(w.item_status(request_id), (ItemStatus::Pending, 0, RequestStatus::Pending));
}

#[test]
fn test_volume_rule_is_enforced() {
    let mut w = world();
    let center = Scope::BloodCenter(w.center_id);
    let service = DonationService::new();

    let mut payload = w.donation(None, ScreeningStatus::NotScreened);
    payload.weight = Some(55.0);
    payload.volume_ml = Some(450);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::Validation(ref errors)) if errors.contains("volume_ml")
    );

    let mut payload = w.donation(None, ScreeningStatus::NotScreened);
    payload.weight = Some(45.0);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::Validation(ref errors)) if errors.contains("weight")
    );

    let mut payload = w.donation(None, ScreeningStatus::NotScreened);
    payload.weight = Some(55.0);
    payload.volume_ml = Some(400);
    let donation = service.create(&mut w.db, &center, payload).unwrap();

    let err = service
        .update(
            &mut w.db,
            &center,
            donation.id,
            UpdateDonation { volume_ml: Some(401), ..Default::default() },
        )
        .unwrap_err();
    assert_matches!(err, DonationError::Validation(ref errors) if errors.contains("volume_ml"));
}

#[test]
fn test_item_must_match_blood_group_and_be_open() {
    let mut w = world();
    let (request_id, item_id) = w.open_request(1);
    let center = Scope::BloodCenter(w.center_id);
    let service = DonationService::new();

    let mut payload = w.donation(Some(item_id), ScreeningStatus::Passed);
    payload.user_id = Some(w.o_pos_donor_id);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::Validation(ref errors)) if errors.contains("blood_request_item_id")
    );

    BloodRequestLifecycleService::new()
        .cancel(&mut w.db, &Scope::Hospital(w.hospital_id), request_id)
        .unwrap();
    let payload = w.donation(Some(item_id), ScreeningStatus::Passed);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::ItemClosed { .. })
    );

    let count: i64 = w
        .db
        .conn()
        .query_row("SELECT COUNT(*) FROM donations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_appointment_must_belong_to_donor_and_be_open() {
    let mut w = world();
    let center = Scope::BloodCenter(w.center_id);
    let service = DonationService::new();

    let foreign = w.appointment(w.o_pos_donor_id);
    let mut payload = w.donation(None, ScreeningStatus::Passed);
    payload.appointment_id = Some(foreign);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::Validation(ref errors)) if errors.contains("appointment_id")
    );

    let cancelled = w.appointment(w.donor_id);
    appointments::set_status(w.db.conn(), cancelled, AppointmentStatus::Cancelled, Utc::now()).unwrap();
    let mut payload = w.donation(None, ScreeningStatus::Passed);
    payload.appointment_id = Some(cancelled);
    assert_matches!(
        service.create(&mut w.db, &center, payload),
        Err(DonationError::AppointmentClosed(ref status)) if status == "cancelled"
    );
}

#[test]
fn test_center_staff_limited_to_own_center() {
    let mut w = world();
    let service = DonationService::new();

    let mut payload = w.donation(None, ScreeningStatus::Passed);
    payload.blood_center_id = Some(w.other_center_id);
    assert_matches!(
        service.create(&mut w.db, &Scope::BloodCenter(w.center_id), payload),
        Err(DonationError::Forbidden)
    );

    let payload = w.donation(None, ScreeningStatus::Passed);
    let donation = service
        .create(&mut w.db, &Scope::BloodCenter(w.center_id), payload)
        .unwrap();
    assert_matches!(
        service.update(
            &mut w.db,
            &Scope::BloodCenter(w.other_center_id),
            donation.id,
            UpdateDonation { notes: Some("edited".to_string()), ..Default::default() },
        ),
        Err(DonationError::Forbidden)
    );
    assert_matches!(
        service.delete(&mut w.db, &Scope::Hospital(w.hospital_id), donation.id),
        Err(DonationError::Forbidden)
    );
    assert_matches!(
        service.show(w.db.conn(), &Scope::Donor(w.o_pos_donor_id), donation.id),
        Err(DonationError::Forbidden)
    );
    assert!(service.show(w.db.conn(), &Scope::Donor(w.donor_id), donation.id).is_ok());
}
