pub mod lifecycle;
pub mod query;

pub use lifecycle::BloodRequestLifecycleService;
pub use query::BloodRequestQueryService;

use tracing::warn;

use shared_utils::scope::Scope;

use crate::models::BloodRequestError;

/// Mutations: system users act on any hospital, hospital staff on their own.
pub(crate) fn authorize_manage(scope: &Scope, hospital_id: i64) -> Result<(), BloodRequestError> {
    match scope {
        Scope::System => Ok(()),
        Scope::Hospital(own) if *own == hospital_id => Ok(()),
        other => {
            warn!("{:?} refused access to blood requests of hospital {}", other, hospital_id);
            Err(BloodRequestError::Forbidden)
        }
    }
}

/// Reads additionally allow blood center staff, who fulfil items.
pub(crate) fn authorize_view(scope: &Scope, hospital_id: i64) -> Result<(), BloodRequestError> {
    match scope {
        Scope::BloodCenter(_) => Ok(()),
        _ => authorize_manage(scope, hospital_id),
    }
}
