//! Firestore REST implementation of the cloud document store.
//!
//! Documents carry every vehicle field except the id, which is the document
//! key. The live subscription re-runs the ordered collection query on a fixed
//! cadence and emits the full set whenever it changes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::cloud::{DocumentStore, Subscription, SubscriptionEvent};
use crate::config::CloudConfig;
use crate::errors::AppError;
use crate::models::{BodyType, FuelType, NewVehicle, Transmission, VehiclePatch, VehicleRecord};

/// Firestore REST client bound to one collection.
#[derive(Clone)]
pub struct FirestoreStore {
    http_client: reqwest::Client,
    documents_url: String,
    collection: String,
    api_key: String,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(config: &CloudConfig, request_timeout: Duration) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent("carz-inventory/0.1")
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                config.base_url.trim_end_matches('/'),
                config.project_id
            ),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            poll_interval: config.poll_interval,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url, self.collection)
    }

    /// URL of one document in the collection, with the id as a single
    /// encoded path segment.
    fn document_url(&self, id: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.documents_url)
            .map_err(|e| AppError::Internal(format!("Invalid cloud store URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Cloud store URL cannot hold a path".to_string()))?
            .push(&self.collection)
            .push(id);
        Ok(url)
    }

    /// Fetch the whole collection ordered by year, newest first.
    async fn run_query(&self) -> Result<Vec<VehicleRecord>, AppError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "year" },
                    "direction": "DESCENDING"
                }]
            }
        });

        let response = self
            .http_client
            .post(format!("{}:runQuery", self.documents_url))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        let rows: Vec<Value> = check(response, "runQuery").await?.json().await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(document) = row.get("document") else {
                continue;
            };
            match decode_document(document) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    tracing::warn!("Skipping undecodable cloud document: {}", reason);
                }
            }
        }

        Ok(records)
    }

    async fn poll_loop(self, tx: mpsc::Sender<SubscriptionEvent>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Vec<VehicleRecord>> = None;

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("Cloud subscription cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.run_query().await {
                Ok(records) => {
                    if last.as_ref() == Some(&records) {
                        continue;
                    }
                    last = Some(records.clone());
                    if tx.send(SubscriptionEvent::Snapshot(records)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("Cloud subscription failed: {}", e);
                    let _ = tx.send(SubscriptionEvent::Error(e)).await;
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn subscribe(&self) -> Result<Subscription, AppError> {
        let (tx, subscription) = Subscription::channel();
        tokio::spawn(self.clone().poll_loop(tx));
        Ok(subscription)
    }

    async fn create(&self, vehicle: &NewVehicle) -> Result<String, AppError> {
        let response = self
            .http_client
            .post(self.collection_url())
            .query(&[("key", &self.api_key)])
            .json(&json!({ "fields": encode_vehicle(vehicle) }))
            .send()
            .await?;
        let created: Value = check(response, "create").await?.json().await?;

        created
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Cloud("Create response carried no document name".to_string()))
    }

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<(), AppError> {
        if !is_document_id(id) {
            return Err(AppError::NotFound(format!("Vehicle {} not found", id)));
        }

        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("currentDocument.exists", "true".to_string()),
        ];
        for path in patch.field_paths() {
            params.push(("updateMask.fieldPaths", path.to_string()));
        }

        let response = self
            .http_client
            .patch(self.document_url(id)?)
            .query(&params)
            .json(&json!({ "fields": encode_patch(patch) }))
            .send()
            .await?;

        match check(response, "update").await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => Err(AppError::NotFound(format!("Vehicle {} not found", id))),
            Err(AppError::Cloud(msg)) if msg.contains("FAILED_PRECONDITION") => {
                Err(AppError::NotFound(format!("Vehicle {} not found", id)))
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        // No document can carry such an id, so there is nothing to remove
        if !is_document_id(id) {
            return Ok(());
        }

        let response = self
            .http_client
            .delete(self.document_url(id)?)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        match check(response, "delete").await {
            Ok(_) | Err(AppError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Whether `id` can name a document directly inside the collection.
fn is_document_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains('/')
}

/// Turn non-success statuses into errors, keeping the provider's message.
async fn check(response: Response, operation: &str) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{} target not found", operation)));
    }
    Err(AppError::Cloud(format!(
        "Cloud {} failed with HTTP {}: {}",
        operation, status, body
    )))
}

// ==================== VALUE CODEC ====================

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn integer_value(n: i64) -> Value {
    json!({ "integerValue": n.to_string() })
}

fn double_value(n: f64) -> Value {
    json!({ "doubleValue": n })
}

fn boolean_value(b: bool) -> Value {
    json!({ "booleanValue": b })
}

fn array_value(items: &[String]) -> Value {
    if items.is_empty() {
        return json!({ "arrayValue": {} });
    }
    let values: Vec<Value> = items.iter().map(|s| string_value(s)).collect();
    json!({ "arrayValue": { "values": values } })
}

/// Encode every field of a new vehicle.
pub fn encode_vehicle(vehicle: &NewVehicle) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("brand".into(), string_value(&vehicle.brand));
    fields.insert("model".into(), string_value(&vehicle.model));
    fields.insert("year".into(), integer_value(vehicle.year.into()));
    fields.insert("price".into(), double_value(vehicle.price));
    fields.insert("mileage".into(), integer_value(vehicle.mileage as i64));
    fields.insert("fuelType".into(), string_value(vehicle.fuel_type.as_str()));
    fields.insert(
        "transmission".into(),
        string_value(vehicle.transmission.as_str()),
    );
    fields.insert("bodyType".into(), string_value(vehicle.body_type.as_str()));
    fields.insert("images".into(), array_value(&vehicle.images));
    fields.insert("description".into(), string_value(&vehicle.description));
    fields.insert("verified".into(), boolean_value(vehicle.verified));
    fields.insert("featured".into(), boolean_value(vehicle.featured));
    fields
}

/// Encode only the supplied fields of a patch.
pub fn encode_patch(patch: &VehiclePatch) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(brand) = &patch.brand {
        fields.insert("brand".into(), string_value(brand));
    }
    if let Some(model) = &patch.model {
        fields.insert("model".into(), string_value(model));
    }
    if let Some(year) = patch.year {
        fields.insert("year".into(), integer_value(year.into()));
    }
    if let Some(price) = patch.price {
        fields.insert("price".into(), double_value(price));
    }
    if let Some(mileage) = patch.mileage {
        fields.insert("mileage".into(), integer_value(mileage as i64));
    }
    if let Some(fuel_type) = patch.fuel_type {
        fields.insert("fuelType".into(), string_value(fuel_type.as_str()));
    }
    if let Some(transmission) = patch.transmission {
        fields.insert("transmission".into(), string_value(transmission.as_str()));
    }
    if let Some(body_type) = patch.body_type {
        fields.insert("bodyType".into(), string_value(body_type.as_str()));
    }
    if let Some(images) = &patch.images {
        fields.insert("images".into(), array_value(images));
    }
    if let Some(description) = &patch.description {
        fields.insert("description".into(), string_value(description));
    }
    if let Some(verified) = patch.verified {
        fields.insert("verified".into(), boolean_value(verified));
    }
    if let Some(featured) = patch.featured {
        fields.insert("featured".into(), boolean_value(featured));
    }
    fields
}

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, String> {
    fields.get(name).ok_or_else(|| format!("missing field {}", name))
}

fn read_string(fields: &Map<String, Value>, name: &str) -> Result<String, String> {
    field(fields, name)?
        .get("stringValue")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("field {} is not a string", name))
}

fn read_integer(fields: &Map<String, Value>, name: &str) -> Result<i64, String> {
    let value = field(fields, name)?;
    if let Some(raw) = value.get("integerValue") {
        // integerValue is a decimal string on the wire
        return raw
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| raw.as_i64())
            .ok_or_else(|| format!("field {} has a malformed integer", name));
    }
    value
        .get("doubleValue")
        .and_then(Value::as_f64)
        .map(|f| f as i64)
        .ok_or_else(|| format!("field {} is not a number", name))
}

fn read_double(fields: &Map<String, Value>, name: &str) -> Result<f64, String> {
    let value = field(fields, name)?;
    if let Some(f) = value.get("doubleValue").and_then(Value::as_f64) {
        return Ok(f);
    }
    value
        .get("integerValue")
        .and_then(|raw| raw.as_str().and_then(|s| s.parse().ok()).or_else(|| raw.as_f64()))
        .ok_or_else(|| format!("field {} is not a number", name))
}

fn read_bool(fields: &Map<String, Value>, name: &str) -> Result<bool, String> {
    field(fields, name)?
        .get("booleanValue")
        .and_then(Value::as_bool)
        .ok_or_else(|| format!("field {} is not a boolean", name))
}

fn read_string_array(fields: &Map<String, Value>, name: &str) -> Result<Vec<String>, String> {
    let array = field(fields, name)?
        .get("arrayValue")
        .ok_or_else(|| format!("field {} is not an array", name))?;

    let Some(values) = array.get("values").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    values
        .iter()
        .map(|v| {
            v.get("stringValue")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("field {} holds a non-string element", name))
        })
        .collect()
}

/// Decode one REST document into a vehicle record.
pub fn decode_document(document: &Value) -> Result<VehicleRecord, String> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or("document has no name")?;
    let id = name.rsplit('/').next().unwrap_or_default().to_string();
    if id.is_empty() {
        return Err(format!("document name {} has no id", name));
    }

    let empty = Map::new();
    let fields = document
        .get("fields")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let fuel = read_string(fields, "fuelType")?;
    let transmission = read_string(fields, "transmission")?;
    let body = read_string(fields, "bodyType")?;
    let mileage = read_integer(fields, "mileage")?;

    Ok(VehicleRecord {
        id,
        brand: read_string(fields, "brand")?,
        model: read_string(fields, "model")?,
        year: i32::try_from(read_integer(fields, "year")?)
            .map_err(|_| "field year is out of range".to_string())?,
        price: read_double(fields, "price")?,
        mileage: u64::try_from(mileage).map_err(|_| "field mileage is negative".to_string())?,
        fuel_type: FuelType::from_str(&fuel).ok_or_else(|| format!("unknown fuel type {}", fuel))?,
        transmission: Transmission::from_str(&transmission)
            .ok_or_else(|| format!("unknown transmission {}", transmission))?,
        body_type: BodyType::from_str(&body).ok_or_else(|| format!("unknown body type {}", body))?,
        images: read_string_array(fields, "images")?,
        description: read_string(fields, "description").unwrap_or_default(),
        verified: read_bool(fields, "verified").unwrap_or(false),
        featured: read_bool(fields, "featured").unwrap_or(false),
    })
}
