//! API request handlers

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::routes::AppState;
use crate::auth;
use crate::error::Error;
use crate::types::{parse_flag, Cafe, CafeDict, NewCafe};

// Query parameters

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Exact location to match
    pub loc: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UpdatePriceParams {
    /// New coffee price, stored as given
    pub new_price: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportClosedParams {
    /// Shared secret allowing deletion
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,
}

// Request bodies

/// Form body of `POST /add`.
///
/// Every field is optional at the extractor level so that missing fields
/// surface as validation errors instead of a bare extractor rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCafeForm {
    pub name: Option<String>,
    pub map_url: Option<String>,
    pub img_url: Option<String>,
    pub location: Option<String>,
    pub seats: Option<String>,
    /// One of true/false, 1/0, on/off
    pub has_toilet: Option<String>,
    /// One of true/false, 1/0, on/off
    pub has_wifi: Option<String>,
    /// One of true/false, 1/0, on/off
    pub has_sockets: Option<String>,
    /// One of true/false, 1/0, on/off
    pub can_take_calls: Option<String>,
    /// Omit to leave the price unset
    pub coffee_price: Option<String>,
}

impl AddCafeForm {
    /// Validate the raw form into a storable cafe
    pub fn into_new_cafe(self) -> crate::Result<NewCafe> {
        let new = NewCafe {
            name: required("name", self.name)?,
            map_url: required("map_url", self.map_url)?,
            img_url: required("img_url", self.img_url)?,
            location: required("location", self.location)?,
            seats: required("seats", self.seats)?,
            has_toilet: flag("has_toilet", self.has_toilet)?,
            has_wifi: flag("has_wifi", self.has_wifi)?,
            has_sockets: flag("has_sockets", self.has_sockets)?,
            can_take_calls: flag("can_take_calls", self.can_take_calls)?,
            coffee_price: self.coffee_price,
        };
        new.validate()?;
        Ok(new)
    }
}

fn required(field: &str, value: Option<String>) -> crate::Result<String> {
    value.ok_or_else(|| Error::Validation(format!("Missing required field '{}'", field)))
}

fn flag(field: &str, value: Option<String>) -> crate::Result<bool> {
    parse_flag(field, &required(field, value)?)
}

// Response types

#[derive(Debug, Serialize, ToSchema)]
pub struct CafeResponse {
    /// A single cafe
    #[schema(value_type = Cafe)]
    pub cafe: CafeDict,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CafeListResponse {
    /// Matching cafes
    #[schema(value_type = Vec<Cafe>)]
    pub cafe: Vec<CafeDict>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessMessage {
    #[serde(rename = "Success")]
    pub success: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Acknowledgement of a completed action
    pub response: SuccessMessage,
}

impl ActionResponse {
    fn success(message: &str) -> Self {
        Self {
            response: SuccessMessage {
                success: message.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error kind
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Translate a domain error into a status code and error envelope
pub fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::DuplicateName(_) => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Unauthorized => StatusCode::FORBIDDEN,
        Error::Database(_)
        | Error::Storage(_)
        | Error::Io(_)
        | Error::Toml(_)
        | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", err);
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                message,
            },
        }),
    )
}

/// Extractor rejections (malformed query, wrong content type) are client errors
fn rejected(rejection: impl std::fmt::Display) -> ApiError {
    api_error(Error::Validation(rejection.to_string()))
}

/// Ids that do not parse can never match a row
fn parse_cafe_id(raw: &str) -> crate::Result<i64> {
    raw.parse().map_err(|_| Error::cafe_not_found())
}

fn cafe_list(cafes: &[Cafe]) -> CafeListResponse {
    CafeListResponse {
        cafe: cafes.iter().map(Cafe::to_dict).collect(),
    }
}

// Handlers

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Return one cafe chosen at random
#[utoipa::path(
    get,
    path = "/random",
    responses(
        (status = 200, description = "A random cafe", body = CafeResponse),
        (status = 404, description = "Catalog is empty", body = ErrorResponse)
    ),
    tag = "cafes"
)]
pub async fn random_cafe(
    State(state): State<AppState>,
) -> Result<Json<CafeResponse>, ApiError> {
    let cafe = state.store.random().map_err(api_error)?;
    Ok(Json(CafeResponse {
        cafe: cafe.to_dict(),
    }))
}

/// Return every cafe
#[utoipa::path(
    get,
    path = "/all",
    responses(
        (status = 200, description = "All cafes", body = CafeListResponse)
    ),
    tag = "cafes"
)]
pub async fn all_cafes(
    State(state): State<AppState>,
) -> Result<Json<CafeListResponse>, ApiError> {
    let cafes = state.store.list_all().map_err(api_error)?;
    Ok(Json(cafe_list(&cafes)))
}

/// Find cafes at an exact location
#[utoipa::path(
    get,
    path = "/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Cafes at the location", body = CafeListResponse),
        (status = 400, description = "Missing location", body = ErrorResponse),
        (status = 404, description = "No cafe at the location", body = ErrorResponse)
    ),
    tag = "cafes"
)]
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<CafeListResponse>, ApiError> {
    let Query(params) = query.map_err(rejected)?;
    let location = params
        .loc
        .ok_or_else(|| Error::Validation("Missing query parameter 'loc'".into()))
        .map_err(api_error)?;

    let cafes = state.store.list_by_location(&location).map_err(api_error)?;
    if cafes.is_empty() {
        return Err(api_error(Error::NotFound(
            "Sorry, we don't have a cafe at that location.".into(),
        )));
    }

    Ok(Json(cafe_list(&cafes)))
}

/// Add a new cafe from a form-encoded body
#[utoipa::path(
    post,
    path = "/add",
    request_body(content = AddCafeForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Cafe added", body = ActionResponse),
        (status = 400, description = "Missing or malformed field", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse)
    ),
    tag = "cafes"
)]
pub async fn add_cafe(
    State(state): State<AppState>,
    form: Result<Form<AddCafeForm>, FormRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Form(form) = form.map_err(rejected)?;
    let new = form.into_new_cafe().map_err(api_error)?;
    let cafe = state.store.create(new).map_err(api_error)?;

    tracing::info!("Added cafe {} ({})", cafe.id, cafe.name);
    Ok(Json(ActionResponse::success("Successfully added the new cafe.")))
}

/// Change the coffee price of a cafe
#[utoipa::path(
    patch,
    path = "/update-price/{cafe_id}",
    params(
        ("cafe_id" = i64, Path, description = "Cafe id"),
        UpdatePriceParams
    ),
    responses(
        (status = 200, description = "Updated cafe", body = CafeResponse),
        (status = 400, description = "Missing new price", body = ErrorResponse),
        (status = 404, description = "Cafe not found", body = ErrorResponse)
    ),
    tag = "cafes"
)]
pub async fn update_price(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<UpdatePriceParams>, QueryRejection>,
) -> Result<Json<CafeResponse>, ApiError> {
    let Path(cafe_id) = path.map_err(|_| api_error(Error::cafe_not_found()))?;
    let Query(params) = query.map_err(rejected)?;
    let id = parse_cafe_id(&cafe_id).map_err(api_error)?;
    let price = params
        .new_price
        .ok_or_else(|| Error::Validation("Missing query parameter 'new_price'".into()))
        .map_err(api_error)?;

    let cafe = state.store.update_price(id, Some(price)).map_err(api_error)?;
    Ok(Json(CafeResponse {
        cafe: cafe.to_dict(),
    }))
}

/// Remove a cafe that has closed; requires the API key
#[utoipa::path(
    delete,
    path = "/report-closed/{cafe_id}",
    params(
        ("cafe_id" = i64, Path, description = "Cafe id"),
        ReportClosedParams
    ),
    responses(
        (status = 200, description = "Cafe removed", body = ActionResponse),
        (status = 403, description = "Wrong or missing API key", body = ErrorResponse),
        (status = 404, description = "Cafe not found", body = ErrorResponse)
    ),
    tag = "cafes"
)]
pub async fn report_closed(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ReportClosedParams>, QueryRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    // An unreadable query carries no usable key
    let provided = query
        .ok()
        .and_then(|Query(params)| params.api_key)
        .unwrap_or_default();
    if !auth::check_key(&provided, &state.api_key) {
        tracing::warn!("Rejected report-closed request: bad api-key");
        return Err(api_error(Error::Unauthorized));
    }

    let Path(cafe_id) = path.map_err(|_| api_error(Error::cafe_not_found()))?;
    let id = parse_cafe_id(&cafe_id).map_err(api_error)?;
    state.store.delete(id).map_err(api_error)?;

    tracing::info!("Removed closed cafe {}", id);
    Ok(Json(ActionResponse::success("Successfully removed the cafe.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_form() -> AddCafeForm {
        AddCafeForm {
            name: Some("Blue Bottle".into()),
            map_url: Some("https://maps.example/blue".into()),
            img_url: Some("https://img.example/blue.jpg".into()),
            location: Some("Downtown".into()),
            seats: Some("20-30".into()),
            has_toilet: Some("true".into()),
            has_wifi: Some("false".into()),
            has_sockets: Some("1".into()),
            can_take_calls: Some("off".into()),
            coffee_price: None,
        }
    }

    #[test]
    fn test_form_into_new_cafe() {
        let new = full_form().into_new_cafe().unwrap();
        assert!(new.has_toilet);
        assert!(!new.has_wifi);
        assert!(new.has_sockets);
        assert!(!new.can_take_calls);
        assert_eq!(new.coffee_price, None);
    }

    #[test]
    fn test_form_missing_field() {
        let form = AddCafeForm {
            img_url: None,
            ..full_form()
        };
        let err = form.into_new_cafe().unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("img_url")));
    }

    #[test]
    fn test_form_rejects_truthy_text() {
        let form = AddCafeForm {
            has_wifi: Some("yes please".into()),
            ..full_form()
        };
        assert!(matches!(form.into_new_cafe(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(api_error(Error::Validation("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(api_error(Error::DuplicateName("x".into())).0, StatusCode::CONFLICT);
        assert_eq!(api_error(Error::cafe_not_found()).0, StatusCode::NOT_FOUND);
        assert_eq!(api_error(Error::Unauthorized).0, StatusCode::FORBIDDEN);

        let (status, Json(body)) = api_error(Error::Config("secret detail".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.kind, "internal");
        assert!(!body.error.message.contains("secret detail"));

        let (status, Json(body)) = api_error(Error::Storage("lock poisoned".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.kind, "internal");
        assert!(!body.error.message.contains("secret detail"));
    }
}
