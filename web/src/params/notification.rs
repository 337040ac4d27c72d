use serde::Deserialize;
use utoipa::ToSchema;

/// Body of `PATCH /notifications/{id}`. An absent `isRead` leaves the read
/// state unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct UpdateParams {
    #[serde(rename = "isRead")]
    pub(crate) is_read: Option<bool>,
}
