use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminVideoQuery {
    /// `pending` (default), `approved` or `all`.
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Which approval states a moderation listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Approved,
    All,
}

impl StatusFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw {
            None | Some("pending") => Ok(StatusFilter::Pending),
            Some("approved") => Ok(StatusFilter::Approved),
            Some("all") => Ok(StatusFilter::All),
            Some(other) => Err(AppError::Validation(format!(
                "status must be one of: pending, approved, all (got '{other}')"
            ))),
        }
    }

    /// Required value of the approval flag, if any.
    pub fn approved(self) -> Option<bool> {
        match self {
            StatusFilter::Pending => Some(false),
            StatusFilter::Approved => Some(true),
            StatusFilter::All => None,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ModerationRequest {
    /// `approved` or `rejected`.
    #[schema(example = "approved")]
    pub status: String,
}

/// Approval flag for a moderation decision.
pub fn decision_flag(status: &str) -> Result<bool, AppError> {
    match status {
        "approved" => Ok(true),
        "rejected" => Ok(false),
        other => Err(AppError::Validation(format!(
            "status must be 'approved' or 'rejected', got '{other}'"
        ))),
    }
}
