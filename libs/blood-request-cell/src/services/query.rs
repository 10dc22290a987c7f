use rusqlite::Connection;
use tracing::{debug, instrument};

use shared_models::pagination::{Paginated, Pagination};
use shared_utils::scope::Scope;

use crate::models::{BloodRequestDetail, BloodRequestError, BloodRequestQuery, BloodRequestSummary};
use crate::repository;
use crate::services::authorize_view;

pub struct BloodRequestQueryService;

impl Default for BloodRequestQueryService {
    fn default() -> Self {
        Self::new()
    }
}

impl BloodRequestQueryService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, conn, query))]
    pub fn list(
        &self,
        conn: &Connection,
        scope: &Scope,
        query: &BloodRequestQuery,
    ) -> Result<Paginated<BloodRequestSummary>, BloodRequestError> {
        let hospital_scope = match scope {
            Scope::System | Scope::BloodCenter(_) => None,
            Scope::Hospital(id) => Some(*id),
            Scope::Donor(_) | Scope::Customer(_) => return Err(BloodRequestError::Forbidden),
        };

        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) = repository::list_requests(conn, query, hospital_scope, pagination)?;
        debug!("Listed {} of {} blood requests", rows.len(), total);

        Ok(Paginated::new(rows, pagination, total))
    }

    pub fn show(
        &self,
        conn: &Connection,
        scope: &Scope,
        request_id: i64,
    ) -> Result<BloodRequestDetail, BloodRequestError> {
        let (hospital_id, _) =
            repository::request_header(conn, request_id)?.ok_or(BloodRequestError::NotFound)?;
        authorize_view(scope, hospital_id)?;
        load_detail(conn, request_id)
    }
}

pub(crate) fn load_detail(conn: &Connection, request_id: i64) -> Result<BloodRequestDetail, BloodRequestError> {
    let request = repository::find_request(conn, request_id)?.ok_or(BloodRequestError::NotFound)?;
    let items = repository::load_items(conn, request_id)?;

    Ok(BloodRequestDetail {
        can_edit: request.status.can_edit(),
        can_delete: request.status.can_delete(),
        request,
        items,
    })
}
