//! Vehicle API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::catalog::{self, CatalogQuery};
use crate::errors::AppError;
use crate::models::{NewVehicle, VehiclePatch, VehicleRecord};
use crate::AppState;

const MIN_YEAR: i32 = 1900;

/// Vehicle page payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    pub vehicle: VehicleRecord,
    pub display_description: String,
    pub similar: Vec<VehicleRecord>,
}

#[derive(Debug, Serialize)]
pub struct CreatedVehicle {
    pub id: String,
}

/// GET /api/vehicles - Filtered and sorted catalog.
pub async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<VehicleRecord>> {
    let revision_id = state.sync.revision_id();
    let records = state.sync.catalog().await;
    success(catalog::filter(&records, &query), revision_id)
}

/// GET /api/vehicles/featured - Featured strip for the home page.
pub async fn featured_vehicles(State(state): State<AppState>) -> ApiResult<Vec<VehicleRecord>> {
    let revision_id = state.sync.revision_id();
    success(catalog::featured(&state.sync.catalog().await), revision_id)
}

/// GET /api/vehicles/brands - Distinct brands for the filter bar.
pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let revision_id = state.sync.revision_id();
    success(catalog::brands(&state.sync.catalog().await), revision_id)
}

/// GET /api/vehicles/:id - Get a single vehicle with its similar vehicles.
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<VehicleDetail> {
    let revision_id = state.sync.revision_id();

    let Some(vehicle) = state.sync.get(&id).await else {
        return error(
            AppError::NotFound(format!("Vehicle {} not found", id)),
            revision_id,
        );
    };

    let records = state.sync.catalog().await;
    success(
        VehicleDetail {
            display_description: catalog::display_description(&vehicle),
            similar: catalog::similar(&records, &vehicle),
            vehicle,
        },
        revision_id,
    )
}

/// POST /api/vehicles - Add a vehicle.
pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(request): Json<NewVehicle>,
) -> ApiResult<CreatedVehicle> {
    let revision_id = state.sync.revision_id();

    if let Err(e) = validate_new(&request) {
        return error(e, revision_id);
    }

    match state.sync.create(normalize_new(request)).await {
        Ok(id) => success(CreatedVehicle { id }, state.sync.revision_id()),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/vehicles/:id - Update the supplied fields of a vehicle.
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<VehiclePatch>,
) -> ApiResult<()> {
    let revision_id = state.sync.revision_id();

    if let Err(e) = validate_patch(&patch) {
        return error(e, revision_id);
    }

    match state.sync.update(&id, &normalize_patch(patch)).await {
        Ok(()) => success((), state.sync.revision_id()),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/vehicles/:id - Remove a vehicle.
pub async fn delete_vehicle(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.sync.revision_id();

    match state.sync.delete(&id).await {
        Ok(()) => success((), state.sync.revision_id()),
        Err(e) => error(e, revision_id),
    }
}

fn validate_new(vehicle: &NewVehicle) -> Result<(), AppError> {
    validate_text("Brand", &vehicle.brand)?;
    validate_text("Model", &vehicle.model)?;
    validate_year(vehicle.year)?;
    validate_price(vehicle.price)?;
    validate_images(&vehicle.images)
}

fn validate_patch(patch: &VehiclePatch) -> Result<(), AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    if let Some(brand) = &patch.brand {
        validate_text("Brand", brand)?;
    }
    if let Some(model) = &patch.model {
        validate_text("Model", model)?;
    }
    if let Some(year) = patch.year {
        validate_year(year)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(images) = &patch.images {
        validate_images(images)?;
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_year(year: i32) -> Result<(), AppError> {
    let max_year = Utc::now().year() + 1;
    if !(MIN_YEAR..=max_year).contains(&year) {
        return Err(AppError::Validation(format!(
            "Year must be between {} and {}",
            MIN_YEAR, max_year
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation(
            "Price must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_images(images: &[String]) -> Result<(), AppError> {
    if !images.iter().any(|i| !i.trim().is_empty()) {
        return Err(AppError::Validation(
            "At least one image is required".to_string(),
        ));
    }
    Ok(())
}

/// Trim names and drop blank image slots left by the form.
fn normalize_new(mut vehicle: NewVehicle) -> NewVehicle {
    vehicle.brand = vehicle.brand.trim().to_string();
    vehicle.model = vehicle.model.trim().to_string();
    vehicle.images.retain(|i| !i.trim().is_empty());
    vehicle
}

/// Same clean-up as `normalize_new`, for the fields a patch carries.
fn normalize_patch(mut patch: VehiclePatch) -> VehiclePatch {
    if let Some(brand) = patch.brand.as_mut() {
        *brand = brand.trim().to_string();
    }
    if let Some(model) = patch.model.as_mut() {
        *model = model.trim().to_string();
    }
    if let Some(images) = patch.images.as_mut() {
        images.retain(|i| !i.trim().is_empty());
    }
    patch
}
