use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use shared_database::Database;
use shared_models::error::FieldErrors;
use shared_utils::scope::Scope;

use crate::models::{
    validate_items, BloodRequestDetail, BloodRequestError, CreateBloodRequest, ItemDraft,
    ItemStatus, RecipientRef, UpdateBloodRequest,
};
use crate::repository::{self, ItemValues, StoredItem};
use crate::services::authorize_manage;
use crate::services::query::load_detail;
use crate::status::{
    ensure_approvable, ensure_cancellable, ensure_deletable, ensure_editable, ensure_item_transition,
};

/// Writes to blood requests. Every command runs in one transaction and
/// leaves the request status consistent with its items.
pub struct BloodRequestLifecycleService;

impl Default for BloodRequestLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl BloodRequestLifecycleService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, db, payload), fields(items = payload.items.len()))]
    pub fn create_with_items(
        &self,
        db: &mut Database,
        scope: &Scope,
        payload: CreateBloodRequest,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let hospital_id = self.target_hospital(db.conn(), scope, payload.hospital_id)?;

        let mut errors = FieldErrors::new();
        if payload.request_date.is_none() {
            errors.add("request_date", "The request date field is required.");
        }
        let drafts = validate_items(&payload.items, &mut errors);
        errors.into_result()?;
        check_references(db.conn(), hospital_id, &drafts, &[])?;

        let request_date = payload.request_date.unwrap_or_else(|| Utc::now().date_naive());
        let notes = clean_notes(payload.notes.as_deref());
        let now = Utc::now();

        let tx = db.transaction()?;
        let request_id = repository::insert_request(&tx, hospital_id, request_date, notes, now)?;
        for draft in &drafts {
            let values = resolve_values(&tx, hospital_id, draft)?;
            repository::insert_item(&tx, request_id, &values, now)?;
        }
        repository::recompute_request_status(&tx, request_id)?;
        tx.commit()?;

        info!(
            "Created blood request {} for hospital {} with {} items",
            request_id,
            hospital_id,
            drafts.len()
        );
        load_detail(db.conn(), request_id)
    }

    #[instrument(skip(self, db, payload), fields(items = payload.items.len()))]
    pub fn update_with_items(
        &self,
        db: &mut Database,
        scope: &Scope,
        request_id: i64,
        payload: UpdateBloodRequest,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let existing =
            repository::find_request(db.conn(), request_id)?.ok_or(BloodRequestError::NotFound)?;
        authorize_manage(scope, existing.hospital_id)?;
        ensure_editable(existing.status)?;

        let mut errors = FieldErrors::new();
        let drafts = validate_items(&payload.items, &mut errors);
        errors.into_result()?;

        let stored = repository::stored_items(db.conn(), request_id)?;
        check_references(db.conn(), existing.hospital_id, &drafts, &stored)?;

        let stored_by_id: HashMap<i64, &StoredItem> = stored.iter().map(|i| (i.id, i)).collect();
        let kept: HashSet<i64> = drafts.iter().filter_map(|d| d.id).collect();

        for draft in &drafts {
            if let Some(item) = draft.id.and_then(|id| stored_by_id.get(&id)) {
                if item.status.is_locked() && draft_changes_item(draft, item) {
                    return Err(locked(item));
                }
                if item.has_donations() && draft.blood_group_id != item.blood_group_id {
                    return Err(credited(item));
                }
            }
        }
        for item in stored.iter().filter(|i| !kept.contains(&i.id)) {
            if item.status == ItemStatus::Fulfilled {
                return Err(locked(item));
            }
            if item.has_donations() {
                return Err(credited(item));
            }
        }

        let request_date = payload.request_date.unwrap_or(existing.request_date);
        let notes = match payload.notes.as_deref() {
            Some(notes) => clean_notes(Some(notes)),
            None => existing.notes.as_deref(),
        };
        let now = Utc::now();

        let tx = db.transaction()?;
        repository::update_request(&tx, request_id, request_date, notes, now)?;

        for item in stored.iter().filter(|i| !kept.contains(&i.id)) {
            debug!("Removing item {} from request {}", item.unique_code, request_id);
            repository::delete_item(&tx, item.id)?;
        }

        for draft in &drafts {
            match draft.id.and_then(|id| stored_by_id.get(&id)) {
                Some(item) if item.status.is_locked() => {}
                Some(item) => {
                    let values = resolve_values(&tx, existing.hospital_id, draft)?;
                    repository::update_item(&tx, item.id, &values, now)?;
                    repository::reconcile_item(&tx, item.id)?;
                }
                None => {
                    let values = resolve_values(&tx, existing.hospital_id, draft)?;
                    repository::insert_item(&tx, request_id, &values, now)?;
                }
            }
        }

        let status = repository::recompute_request_status(&tx, request_id)?;
        tx.commit()?;

        info!("Updated blood request {} (now {})", request_id, status);
        load_detail(db.conn(), request_id)
    }

    #[instrument(skip(self, db))]
    pub fn delete(&self, db: &mut Database, scope: &Scope, request_id: i64) -> Result<(), BloodRequestError> {
        let (hospital_id, status) =
            repository::request_header(db.conn(), request_id)?.ok_or(BloodRequestError::NotFound)?;
        authorize_manage(scope, hospital_id)?;
        ensure_deletable(status)?;

        let stored = repository::stored_items(db.conn(), request_id)?;
        if let Some(item) = stored.iter().find(|i| i.has_donations()) {
            return Err(credited(item));
        }

        let tx = db.transaction()?;
        repository::delete_request(&tx, request_id)?;
        tx.commit()?;

        info!("Deleted blood request {} of hospital {}", request_id, hospital_id);
        Ok(())
    }

    /// Approve every pending item of a request.
    #[instrument(skip(self, db))]
    pub fn approve(
        &self,
        db: &mut Database,
        scope: &Scope,
        request_id: i64,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let (hospital_id, status) =
            repository::request_header(db.conn(), request_id)?.ok_or(BloodRequestError::NotFound)?;
        require_system(scope, hospital_id)?;
        ensure_approvable(status)?;

        let stored = repository::stored_items(db.conn(), request_id)?;
        let now = Utc::now();

        let tx = db.transaction()?;
        for item in stored.iter().filter(|i| i.status == ItemStatus::Pending) {
            repository::set_item_status(&tx, item.id, ItemStatus::Approved, now)?;
            repository::reconcile_item(&tx, item.id)?;
        }
        let status = repository::recompute_request_status(&tx, request_id)?;
        tx.commit()?;

        info!("Approved blood request {} (now {})", request_id, status);
        load_detail(db.conn(), request_id)
    }

    /// Cancel every open item of a request.
    #[instrument(skip(self, db))]
    pub fn cancel(
        &self,
        db: &mut Database,
        scope: &Scope,
        request_id: i64,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let (hospital_id, status) =
            repository::request_header(db.conn(), request_id)?.ok_or(BloodRequestError::NotFound)?;
        authorize_manage(scope, hospital_id)?;
        ensure_cancellable(status)?;

        let stored = repository::stored_items(db.conn(), request_id)?;
        let now = Utc::now();

        let tx = db.transaction()?;
        for item in stored.iter().filter(|i| i.status.is_open()) {
            repository::set_item_status(&tx, item.id, ItemStatus::Cancelled, now)?;
        }
        let status = repository::recompute_request_status(&tx, request_id)?;
        tx.commit()?;

        info!("Cancelled blood request {} (now {})", request_id, status);
        load_detail(db.conn(), request_id)
    }

    #[instrument(skip(self, db))]
    pub fn set_item_status(
        &self,
        db: &mut Database,
        scope: &Scope,
        request_id: i64,
        item_id: i64,
        next: ItemStatus,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let (hospital_id, status) =
            repository::request_header(db.conn(), request_id)?.ok_or(BloodRequestError::NotFound)?;
        require_system(scope, hospital_id)?;
        ensure_editable(status)?;

        let item = repository::find_stored_item(db.conn(), item_id)?
            .filter(|i| i.blood_request_id == request_id)
            .ok_or(BloodRequestError::ItemNotFound)?;
        ensure_item_transition(item.status, next)?;

        let tx = db.transaction()?;
        repository::set_item_status(&tx, item.id, next, Utc::now())?;
        let status = repository::recompute_request_status(&tx, request_id)?;
        tx.commit()?;

        info!(
            "Item {} moved {} -> {}; request {} is {}",
            item.unique_code, item.status, next, request_id, status
        );
        load_detail(db.conn(), request_id)
    }

    fn target_hospital(
        &self,
        conn: &Connection,
        scope: &Scope,
        requested: Option<i64>,
    ) -> Result<i64, BloodRequestError> {
        match scope {
            Scope::Hospital(own) => match requested {
                Some(other) if other != *own => {
                    warn!("Hospital {} tried to file a request for hospital {}", own, other);
                    Err(BloodRequestError::Forbidden)
                }
                _ => Ok(*own),
            },
            Scope::System => {
                let Some(hospital_id) = requested else {
                    return Err(
                        FieldErrors::single("hospital_id", "The hospital field is required.").into(),
                    );
                };
                if !repository::hospital_exists(conn, hospital_id)? {
                    return Err(
                        FieldErrors::single("hospital_id", "The selected hospital is invalid.").into(),
                    );
                }
                Ok(hospital_id)
            }
            _ => Err(BloodRequestError::Forbidden),
        }
    }
}

fn require_system(scope: &Scope, hospital_id: i64) -> Result<(), BloodRequestError> {
    if scope.is_system() {
        Ok(())
    } else {
        warn!("{:?} attempted a system-only action on hospital {}", scope, hospital_id);
        Err(BloodRequestError::Forbidden)
    }
}

fn clean_notes(notes: Option<&str>) -> Option<&str> {
    notes.map(str::trim).filter(|n| !n.is_empty())
}

fn locked(item: &StoredItem) -> BloodRequestError {
    BloodRequestError::ItemLocked {
        code: item.unique_code.clone(),
        status: item.status,
    }
}

fn credited(item: &StoredItem) -> BloodRequestError {
    BloodRequestError::ItemHasDonations {
        code: item.unique_code.clone(),
        donations: item.linked_donations,
    }
}

fn draft_changes_item(draft: &ItemDraft, item: &StoredItem) -> bool {
    let recipient_changed = match &draft.recipient {
        RecipientRef::General => item.recipient_id.is_some(),
        RecipientRef::Existing(id) => item.recipient_id != Some(*id),
        RecipientRef::New(_) => true,
    };
    recipient_changed
        || draft.blood_group_id != item.blood_group_id
        || draft.units_requested != item.units_requested
        || draft.urgency != item.urgency
}

/// Database-backed checks on validated drafts, reported per item.
fn check_references(
    conn: &Connection,
    hospital_id: i64,
    drafts: &[ItemDraft],
    stored: &[StoredItem],
) -> Result<(), BloodRequestError> {
    let mut errors = FieldErrors::new();

    for (index, draft) in drafts.iter().enumerate() {
        let field = |name: &str| format!("items.{}.{}", index, name);

        if let Some(id) = draft.id {
            if !stored.iter().any(|i| i.id == id) {
                errors.add(field("id"), "The selected item does not belong to this request.");
            }
        }

        if !repository::blood_group_exists(conn, draft.blood_group_id)? {
            errors.add(field("blood_group_id"), "The selected blood group is invalid.");
        }

        match &draft.recipient {
            RecipientRef::General => {}
            RecipientRef::Existing(recipient_id) => {
                match repository::recipient_hospital(conn, *recipient_id)? {
                    Some(owner) if owner == hospital_id => {}
                    Some(_) => errors.add(
                        field("recipient_id"),
                        "The recipient belongs to a different hospital.",
                    ),
                    None => errors.add(field("recipient_id"), "The selected recipient is invalid."),
                }
            }
            RecipientRef::New(recipient) => {
                if !repository::blood_group_exists(conn, recipient.blood_group_id)? {
                    errors.add(
                        field("recipient_data.blood_group_id"),
                        "The selected blood group is invalid.",
                    );
                }
            }
        }
    }

    errors.into_result()?;
    Ok(())
}

/// Column values for a draft, creating its new recipient when needed.
fn resolve_values(
    conn: &Connection,
    hospital_id: i64,
    draft: &ItemDraft,
) -> Result<ItemValues, BloodRequestError> {
    let recipient_id = match &draft.recipient {
        RecipientRef::General => None,
        RecipientRef::Existing(id) => Some(*id),
        RecipientRef::New(recipient) => {
            let id = repository::insert_recipient(conn, hospital_id, recipient, Utc::now())?;
            debug!("Registered recipient {} for hospital {}", id, hospital_id);
            Some(id)
        }
    };

    Ok(ItemValues {
        blood_group_id: draft.blood_group_id,
        recipient_id,
        units_requested: draft.units_requested,
        urgency: draft.urgency,
    })
}
