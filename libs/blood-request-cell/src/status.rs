//! Blood request state machine.
//!
//! Item statuses move along an explicit transition table; the request status
//! is never written directly and is always derived from its items.

use tracing::{debug, warn};

use crate::models::{BloodRequestError, ItemStatus, RequestStatus};

impl ItemStatus {
    pub fn allowed_transitions(&self) -> &'static [ItemStatus] {
        match self {
            ItemStatus::Pending => &[ItemStatus::Approved, ItemStatus::Fulfilled, ItemStatus::Cancelled],
            ItemStatus::Approved => &[ItemStatus::Fulfilled, ItemStatus::Cancelled],
            ItemStatus::Fulfilled => &[ItemStatus::Approved],
            ItemStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Open items still await blood.
    pub fn is_open(&self) -> bool {
        matches!(self, ItemStatus::Pending | ItemStatus::Approved)
    }

    /// Fulfilled and cancelled items reject payload edits.
    pub fn is_locked(&self) -> bool {
        matches!(self, ItemStatus::Fulfilled | ItemStatus::Cancelled)
    }
}

impl RequestStatus {
    pub fn can_edit(&self) -> bool {
        !matches!(self, RequestStatus::Fulfilled | RequestStatus::Cancelled)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Cancelled)
    }

    pub fn can_approve(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Partial)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Fulfilled | RequestStatus::Cancelled)
    }
}

pub fn ensure_editable(status: RequestStatus) -> Result<(), BloodRequestError> {
    guard(status.can_edit(), "edit", status)
}

pub fn ensure_deletable(status: RequestStatus) -> Result<(), BloodRequestError> {
    guard(status.can_delete(), "delete", status)
}

pub fn ensure_approvable(status: RequestStatus) -> Result<(), BloodRequestError> {
    guard(status.can_approve(), "approve", status)
}

pub fn ensure_cancellable(status: RequestStatus) -> Result<(), BloodRequestError> {
    guard(status.can_cancel(), "cancel", status)
}

pub fn ensure_item_transition(from: ItemStatus, to: ItemStatus) -> Result<(), BloodRequestError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        warn!("Invalid item status transition attempted: {} -> {}", from, to);
        Err(BloodRequestError::InvalidItemTransition { from, to })
    }
}

fn guard(allowed: bool, action: &'static str, status: RequestStatus) -> Result<(), BloodRequestError> {
    if allowed {
        Ok(())
    } else {
        warn!("Refusing to {} blood request in status {}", action, status);
        Err(BloodRequestError::InvalidState { action, status })
    }
}

/// Aggregate request status from item statuses.
pub fn derive_request_status(items: &[ItemStatus]) -> RequestStatus {
    let active: Vec<ItemStatus> = items
        .iter()
        .copied()
        .filter(|s| *s != ItemStatus::Cancelled)
        .collect();

    if active.is_empty() {
        // A request always has items; all of them cancelled means the request is.
        return if items.is_empty() {
            RequestStatus::Pending
        } else {
            RequestStatus::Cancelled
        };
    }

    let fulfilled = active.iter().filter(|s| **s == ItemStatus::Fulfilled).count();
    let approved = active.iter().filter(|s| **s == ItemStatus::Approved).count();

    let status = if fulfilled == active.len() {
        RequestStatus::Fulfilled
    } else if fulfilled > 0 {
        RequestStatus::Partial
    } else if approved == active.len() {
        RequestStatus::Approved
    } else if approved > 0 {
        RequestStatus::Partial
    } else {
        RequestStatus::Pending
    };

    debug!("Derived request status {} from {} items", status, items.len());
    status
}

/// Item status after counting the units delivered by passed donations.
pub fn reconcile_item_status(current: ItemStatus, delivered: i64, requested: i64) -> ItemStatus {
    match current {
        ItemStatus::Cancelled => ItemStatus::Cancelled,
        _ if delivered >= requested => ItemStatus::Fulfilled,
        ItemStatus::Fulfilled => ItemStatus::Approved,
        ItemStatus::Pending if delivered > 0 => ItemStatus::Approved,
        other => other,
    }
}
