//! Vehicle model matching the frontend Car interface.

use serde::{Deserialize, Serialize};

/// Fuel type of a vehicle.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FuelType {
    Petrol,
    Diesel,
    CNG,
    Electric,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::CNG => "CNG",
            FuelType::Electric => "Electric",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Petrol" => Some(FuelType::Petrol),
            "Diesel" => Some(FuelType::Diesel),
            "CNG" => Some(FuelType::CNG),
            "Electric" => Some(FuelType::Electric),
            _ => None,
        }
    }
}

/// Gearbox type of a vehicle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Transmission {
    Manual,
    Automatic,
}

impl Transmission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transmission::Manual => "Manual",
            Transmission::Automatic => "Automatic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Manual" => Some(Transmission::Manual),
            "Automatic" => Some(Transmission::Automatic),
            _ => None,
        }
    }
}

/// Body style classification.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BodyType {
    Sedan,
    SUV,
    Hatchback,
    Luxury,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Sedan => "Sedan",
            BodyType::SUV => "SUV",
            BodyType::Hatchback => "Hatchback",
            BodyType::Luxury => "Luxury",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Sedan" => Some(BodyType::Sedan),
            "SUV" => Some(BodyType::SUV),
            "Hatchback" => Some(BodyType::Hatchback),
            "Luxury" => Some(BodyType::Luxury),
            _ => None,
        }
    }
}

/// A catalog entry.
///
/// `price` is in lakhs of rupees and `mileage` in kilometres. The first image
/// is the cover image; entries are either remote URLs or `data:` URIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub mileage: u64,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub body_type: BodyType,
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub verified: bool,
    pub featured: bool,
}

impl VehicleRecord {
    /// Attach an assigned id to a new vehicle.
    pub fn with_id(id: impl Into<String>, vehicle: NewVehicle) -> Self {
        Self {
            id: id.into(),
            brand: vehicle.brand,
            model: vehicle.model,
            year: vehicle.year,
            price: vehicle.price,
            mileage: vehicle.mileage,
            fuel_type: vehicle.fuel_type,
            transmission: vehicle.transmission,
            body_type: vehicle.body_type,
            images: vehicle.images,
            description: vehicle.description,
            verified: vehicle.verified,
            featured: vehicle.featured,
        }
    }

    /// Every field except the id.
    pub fn to_new(&self) -> NewVehicle {
        NewVehicle {
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            price: self.price,
            mileage: self.mileage,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            body_type: self.body_type,
            images: self.images.clone(),
            description: self.description.clone(),
            verified: self.verified,
            featured: self.featured,
        }
    }

    /// Merge the supplied fields into this record. The id never changes.
    pub fn apply(&mut self, patch: &VehiclePatch) {
        if let Some(brand) = &patch.brand {
            self.brand = brand.clone();
        }
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(mileage) = patch.mileage {
            self.mileage = mileage;
        }
        if let Some(fuel_type) = patch.fuel_type {
            self.fuel_type = fuel_type;
        }
        if let Some(transmission) = patch.transmission {
            self.transmission = transmission;
        }
        if let Some(body_type) = patch.body_type {
            self.body_type = body_type;
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(verified) = patch.verified {
            self.verified = verified;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
    }
}

/// A vehicle that has not been assigned an id yet.
///
/// This is also the request body for creating a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub mileage: u64,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub body_type: BodyType,
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_verified")]
    pub verified: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_verified() -> bool {
    true
}

/// Partial update: only the supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<FuelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl VehiclePatch {
    /// Wire names of the supplied fields, in declaration order.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.brand.is_some() {
            paths.push("brand");
        }
        if self.model.is_some() {
            paths.push("model");
        }
        if self.year.is_some() {
            paths.push("year");
        }
        if self.price.is_some() {
            paths.push("price");
        }
        if self.mileage.is_some() {
            paths.push("mileage");
        }
        if self.fuel_type.is_some() {
            paths.push("fuelType");
        }
        if self.transmission.is_some() {
            paths.push("transmission");
        }
        if self.body_type.is_some() {
            paths.push("bodyType");
        }
        if self.images.is_some() {
            paths.push("images");
        }
        if self.description.is_some() {
            paths.push("description");
        }
        if self.verified.is_some() {
            paths.push("verified");
        }
        if self.featured.is_some() {
            paths.push("featured");
        }
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }
}
