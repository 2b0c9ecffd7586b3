use {
    crate::domain::{auction, intake},
    axum::{Json, http::StatusCode},
    serde::Serialize,
};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "PascalCase")]
enum Kind {
    ValidationError,
    DuplicateKeyError,
    UnsupportedChainError,
    LateBidError,
    InsufficientBidError,
    OpportunityNotFound,
}

impl Kind {
    fn status(self) -> StatusCode {
        match self {
            Self::OpportunityNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    error_type: Kind,
    description: String,
}

pub type Response = (StatusCode, Json<Error>);

fn response(kind: Kind, description: impl ToString) -> Response {
    (
        kind.status(),
        Json(Error {
            error_type: kind,
            description: description.to_string(),
        }),
    )
}

/// A request body that could not be decoded.
pub fn malformed(err: impl std::fmt::Display) -> Response {
    response(Kind::ValidationError, err)
}

impl From<intake::SubmitError> for (StatusCode, Json<Error>) {
    fn from(value: intake::SubmitError) -> Self {
        let kind = match &value {
            intake::SubmitError::Validation(_) => Kind::ValidationError,
            intake::SubmitError::UnsupportedChain(_) => Kind::UnsupportedChainError,
            intake::SubmitError::DuplicateKey(_) => Kind::DuplicateKeyError,
        };
        response(kind, value)
    }
}

impl From<auction::SubmitBidError> for (StatusCode, Json<Error>) {
    fn from(value: auction::SubmitBidError) -> Self {
        let kind = match &value {
            auction::SubmitBidError::NotFound(_) => Kind::OpportunityNotFound,
            auction::SubmitBidError::Rejected(auction::BidError::Late) => Kind::LateBidError,
            auction::SubmitBidError::Rejected(auction::BidError::Insufficient { .. }) => {
                Kind::InsufficientBidError
            }
            auction::SubmitBidError::Rejected(auction::BidError::Zero) => Kind::ValidationError,
        };
        response(kind, value)
    }
}

impl From<auction::NotFound> for (StatusCode, Json<Error>) {
    fn from(value: auction::NotFound) -> Self {
        response(Kind::OpportunityNotFound, value)
    }
}
