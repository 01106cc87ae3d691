//! Read-side views over the installed catalog.
//!
//! Pure functions over a slice of records; the HTTP layer feeds them the
//! current catalog from the sync service.

use serde::Deserialize;

use crate::models::VehicleRecord;

/// Number of records shown in featured and similar strips.
pub const STRIP_SIZE: usize = 3;

/// Marker the storefront uses for "no filter".
const ANY: &str = "All";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "year-new")]
    YearNew,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
}

/// Storefront filter parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    /// Free-text term matched against brand or model
    pub q: Option<String>,
    pub brand: Option<String>,
    pub fuel: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ANY)
}

/// Filter and sort the catalog for the inventory page.
pub fn filter(records: &[VehicleRecord], query: &CatalogQuery) -> Vec<VehicleRecord> {
    let term = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .unwrap_or_default();
    let brand = selected(&query.brand);
    let fuel = selected(&query.fuel);
    let body = selected(&query.body);

    let mut matches: Vec<VehicleRecord> = records
        .iter()
        .filter(|r| {
            term.is_empty()
                || r.brand.to_lowercase().contains(&term)
                || r.model.to_lowercase().contains(&term)
        })
        .filter(|r| brand.map_or(true, |b| r.brand == b))
        .filter(|r| fuel.map_or(true, |f| r.fuel_type.as_str() == f))
        .filter(|r| body.map_or(true, |b| r.body_type.as_str() == b))
        .cloned()
        .collect();

    match query.sort {
        SortOrder::YearNew => matches.sort_by(|a, b| b.year.cmp(&a.year)),
        SortOrder::PriceLow => matches.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortOrder::PriceHigh => matches.sort_by(|a, b| b.price.total_cmp(&a.price)),
    }
    matches
}

/// Distinct brands in first-seen order.
pub fn brands(records: &[VehicleRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        if !seen.contains(&record.brand) {
            seen.push(record.brand.clone());
        }
    }
    seen
}

pub fn featured(records: &[VehicleRecord]) -> Vec<VehicleRecord> {
    records
        .iter()
        .filter(|r| r.featured)
        .take(STRIP_SIZE)
        .cloned()
        .collect()
}

/// Other vehicles sharing the body type or the brand of `vehicle`.
pub fn similar(records: &[VehicleRecord], vehicle: &VehicleRecord) -> Vec<VehicleRecord> {
    records
        .iter()
        .filter(|r| r.id != vehicle.id)
        .filter(|r| r.body_type == vehicle.body_type || r.brand == vehicle.brand)
        .take(STRIP_SIZE)
        .cloned()
        .collect()
}

/// The stored description, or a generated one when it is blank.
pub fn display_description(vehicle: &VehicleRecord) -> String {
    if !vehicle.description.trim().is_empty() {
        return vehicle.description.clone();
    }
    format!(
        "This well-maintained {} {} from {} is an excellent choice for anyone looking for \
         reliability and performance in Chandrapur. Features include a clean history and a \
         smooth {} drive.",
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        vehicle.transmission.as_str().to_lowercase()
    )
}

/// Admin console search over "{brand} {model}".
pub fn admin_filter(records: &[VehicleRecord], term: Option<&str>) -> Vec<VehicleRecord> {
    let term = term.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    records
        .iter()
        .filter(|r| format!("{} {}", r.brand, r.model).to_lowercase().contains(&term))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transmission;
    use crate::store::starter_inventory;

    fn ids(records: &[VehicleRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_default_query_sorts_newest_first() {
        let records = starter_inventory();
        let result = filter(&records, &CatalogQuery::default());

        assert_eq!(result.len(), records.len());
        assert!(result.windows(2).all(|w| w[0].year >= w[1].year));
    }

    #[test]
    fn test_text_search_matches_brand_or_model() {
        let records = starter_inventory();

        let query = CatalogQuery {
            q: Some("creta".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &query)), vec!["2"]);

        let query = CatalogQuery {
            q: Some("TOYOTA".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&records, &query)), vec!["6"]);
    }

    #[test]
    fn test_all_means_no_filter() {
        let records = starter_inventory();
        let query = CatalogQuery {
            brand: Some("All".to_string()),
            fuel: Some("All".to_string()),
            body: Some("All".to_string()),
            ..Default::default()
        };
        assert_eq!(filter(&records, &query).len(), records.len());
    }

    #[test]
    fn test_fuel_and_body_filters() {
        let records = starter_inventory();
        let query = CatalogQuery {
            fuel: Some("Electric".to_string()),
            ..Default::default()
        };
        let result = filter(&records, &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].brand, "Tata");

        let query = CatalogQuery {
            body: Some("SUV".to_string()),
            sort: SortOrder::PriceLow,
            ..Default::default()
        };
        let result = filter(&records, &query);
        assert!(!result.is_empty());
        assert!(result.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[test]
    fn test_price_high_sort() {
        let records = starter_inventory();
        let query = CatalogQuery {
            sort: SortOrder::PriceHigh,
            ..Default::default()
        };
        let result = filter(&records, &query);
        assert!(result.windows(2).all(|w| w[0].price >= w[1].price));
    }

    #[test]
    fn test_sort_order_wire_names() {
        let query: CatalogQuery =
            serde_json::from_value(serde_json::json!({ "sort": "price-high" })).unwrap();
        assert_eq!(query.sort, SortOrder::PriceHigh);
        assert!(serde_json::from_value::<SortOrder>(serde_json::json!("cheapest")).is_err());
    }

    #[test]
    fn test_brands_first_seen_order() {
        let mut records = starter_inventory();
        let mut again = records[0].clone();
        again.id = "7".to_string();
        records.push(again);

        let brands = brands(&records);
        assert_eq!(brands.len(), 6);
        assert_eq!(brands[0], records[0].brand);
    }

    #[test]
    fn test_featured_takes_first_three() {
        let mut records = starter_inventory();
        for r in records.iter_mut() {
            r.featured = true;
        }
        assert_eq!(ids(&featured(&records)), vec!["1", "2", "3"]);
        assert_eq!(ids(&featured(&starter_inventory())), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_similar_excludes_self() {
        let records = starter_inventory();
        let creta = records.iter().find(|r| r.id == "2").unwrap();
        let result = similar(&records, creta);

        assert!(result.len() <= STRIP_SIZE);
        assert!(result.iter().all(|r| r.id != "2"));
        assert!(result
            .iter()
            .all(|r| r.body_type == creta.body_type || r.brand == creta.brand));
    }

    #[test]
    fn test_display_description_template() {
        let mut record = starter_inventory().remove(0);
        record.description = "  ".to_string();
        record.transmission = Transmission::Automatic;

        let text = display_description(&record);
        assert!(text.starts_with(&format!(
            "This well-maintained {} {} from {}",
            record.brand, record.model, record.year
        )));
        assert!(text.ends_with("a smooth automatic drive."));

        record.description = "One owner.".to_string();
        assert_eq!(display_description(&record), "One owner.");
    }

    #[test]
    fn test_admin_filter_spans_brand_and_model() {
        let records = starter_inventory();
        let result = admin_filter(&records, Some("suzuki swift"));
        assert_eq!(ids(&result), vec!["1"]);
        assert_eq!(admin_filter(&records, None).len(), records.len());
    }
}
