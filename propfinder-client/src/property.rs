//! Property endpoints of the Propfinder API.
//!
//! Typed models for the listing search (`GET properties_listings/`) and the
//! per-property CRUD endpoints (`properties/` and `properties/{id}`), plus
//! the [`AuthenticatedClient`] calls that use them. All of them go through
//! the same header snapshot and interceptor chain as any other request.

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::client::AuthenticatedClient;
use crate::types::Result;

/// Page size the server uses when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Filters and paging for the listing search.
///
/// Unset filters are left out of the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    /// Matches any address word against house number, street, city, etc.
    pub full_address: Option<String>,
    pub class_description: Option<String>,
    pub estimated_market_value_min: Option<u64>,
    pub estimated_market_value_max: Option<u64>,
    pub bldg_use: Option<String>,
    pub building_sq_ft_min: Option<u64>,
    pub building_sq_ft_max: Option<u64>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for PropertyQuery {
    fn default() -> Self {
        Self {
            full_address: None,
            class_description: None,
            estimated_market_value_min: None,
            estimated_market_value_max: None,
            bldg_use: None,
            building_sq_ft_min: None,
            building_sq_ft_max: None,
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PropertyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.full_address = Some(address.into());
        self
    }

    pub fn class_description(mut self, class: impl Into<String>) -> Self {
        self.class_description = Some(class.into());
        self
    }

    pub fn bldg_use(mut self, bldg_use: impl Into<String>) -> Self {
        self.bldg_use = Some(bldg_use.into());
        self
    }

    pub fn market_value(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.estimated_market_value_min = min;
        self.estimated_market_value_max = max;
        self
    }

    pub fn building_sq_ft(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.building_sq_ft_min = min;
        self.building_sq_ft_max = max;
        self
    }

    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// The same filters, advanced by one page.
    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.skip = self.skip.saturating_add(self.limit);
        next
    }

    /// Query string pairs in a stable order. Empty text filters are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let text = [
            ("full_address", &self.full_address),
            ("class_description", &self.class_description),
            ("bldg_use", &self.bldg_use),
        ];
        for (name, value) in text {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, value.to_string()));
            }
        }

        let numbers = [
            ("estimated_market_value_min", self.estimated_market_value_min),
            ("estimated_market_value_max", self.estimated_market_value_max),
            ("building_sq_ft_min", self.building_sq_ft_min),
            ("building_sq_ft_max", self.building_sq_ft_max),
        ];
        for (name, value) in numbers {
            if let Some(value) = value {
                pairs.push((name, value.to_string()));
            }
        }

        pairs.push(("skip", self.skip.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// One row of the listing search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub id: i64,
    #[serde(default)]
    pub full_address: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub class_description: Option<String>,
    pub estimated_market_value: Option<i64>,
    pub building_sq_ft: Option<i64>,
    pub bldg_use: Option<String>,
}

/// A page of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPage {
    #[serde(alias = "data")]
    pub properties: Vec<PropertyListing>,
    /// Whether another page may follow.
    #[serde(rename = "moreExists", alias = "more_exists")]
    pub more_exists: bool,
}

/// Full record for a single property.
///
/// The commonly displayed fields are typed; everything else the server
/// returns is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetail {
    pub id: i64,
    pub full_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub house_no: Option<String>,
    pub dir: Option<String>,
    pub street: Option<String>,
    pub suffix: Option<String>,
    pub apt: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub class_description: Option<String>,
    pub bldg_use: Option<String>,
    pub estimated_market_value: Option<i64>,
    pub building_sq_ft: Option<i64>,
    pub land_sq_ft: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PropertyDetail {
    /// Display address: `full_address` when present, else the joined parts.
    pub fn address(&self) -> String {
        if let Some(full) = self.full_address.as_deref().filter(|a| !a.trim().is_empty()) {
            return full.to_string();
        }
        [
            &self.house_no,
            &self.dir,
            &self.street,
            &self.suffix,
            &self.apt,
            &self.city,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Body of `POST properties/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub longitude: f64,
    pub latitude: f64,
    pub zip: String,
    pub house_no: String,
    pub dir: String,
    pub street: String,
    pub suffix: String,
    pub apt: String,
    pub city: String,
}

/// Body of `PUT properties/{id}`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl PropertyUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Address record returned by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub house_no: Option<String>,
    pub dir: Option<String>,
    pub street: Option<String>,
    pub suffix: Option<String>,
    pub apt: Option<String>,
    pub city: Option<String>,
}

/// Accept a string or a number; the backend stores zip and house number as integers.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn property_path(id: i64) -> String {
    format!("properties/{}", id)
}

impl AuthenticatedClient {
    /// Search listings with `query`.
    pub async fn list_properties(&self, query: &PropertyQuery) -> Result<PropertyPage> {
        let mut request = self.request(Method::GET, "properties_listings/")?;
        request.url.query_pairs_mut().extend_pairs(query.to_pairs());
        debug!("listing properties (skip {}, limit {})", query.skip, query.limit);
        self.execute(request).await?.json()
    }

    /// Fetch one property. A missing property is a 404 [`ClientError::Status`].
    ///
    /// [`ClientError::Status`]: crate::ClientError::Status
    pub async fn get_property(&self, id: i64) -> Result<PropertyDetail> {
        self.get_json(&property_path(id)).await
    }

    pub async fn create_property(&self, property: &NewProperty) -> Result<PropertyRecord> {
        self.post_json("properties/", property).await?.json()
    }

    pub async fn update_property(&self, id: i64, update: &PropertyUpdate) -> Result<PropertyRecord> {
        self.put_json(&property_path(id), update).await?.json()
    }

    pub async fn delete_property(&self, id: i64) -> Result<()> {
        self.delete(&property_path(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_query_only_pages() {
        let pairs = PropertyQuery::new().to_pairs();
        assert_eq!(
            pairs,
            vec![("skip", "0".to_string()), ("limit", "25".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_include_set_filters() {
        let query = PropertyQuery::new()
            .address("  123 Main ")
            .class_description("")
            .bldg_use("Single Family")
            .market_value(Some(100_000), None)
            .building_sq_ft(None, Some(2_500))
            .page(50, 10);

        assert_eq!(
            query.to_pairs(),
            vec![
                ("full_address", "123 Main".to_string()),
                ("bldg_use", "Single Family".to_string()),
                ("estimated_market_value_min", "100000".to_string()),
                ("building_sq_ft_max", "2500".to_string()),
                ("skip", "50".to_string()),
                ("limit", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_next_page_keeps_filters() {
        let query = PropertyQuery::new().address("Main").page(25, 25);
        let next = query.next_page();

        assert_eq!(next.skip, 50);
        assert_eq!(next.full_address.as_deref(), Some("Main"));
    }

    #[test]
    fn test_page_accepts_both_field_spellings() {
        let page: PropertyPage = serde_json::from_value(json!({
            "properties": [{"id": 1, "full_address": "1 N Main St Chicago"}],
            "moreExists": true
        }))
        .unwrap();
        assert!(page.more_exists);
        assert_eq!(page.properties[0].full_address, "1 N Main St Chicago");
        assert_eq!(page.properties[0].estimated_market_value, None);

        let page: PropertyPage =
            serde_json::from_value(json!({"data": [], "more_exists": false})).unwrap();
        assert!(page.properties.is_empty());
        assert!(!page.more_exists);
    }

    #[test]
    fn test_detail_keeps_unknown_fields_and_numeric_zip() {
        let detail: PropertyDetail = serde_json::from_value(json!({
            "id": 7,
            "house_no": 123,
            "dir": "N",
            "street": "Main",
            "suffix": "St",
            "apt": "",
            "city": "Chicago",
            "zip": 60601,
            "full_bath": 2,
            "pin": 1234567
        }))
        .unwrap();

        assert_eq!(detail.zip.as_deref(), Some("60601"));
        assert_eq!(detail.address(), "123 N Main St Chicago");
        assert_eq!(detail.extra["full_bath"], json!(2));
        assert_eq!(detail.extra["pin"], json!(1234567));
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = PropertyUpdate {
            city: Some("Evanston".to_string()),
            ..PropertyUpdate::default()
        };

        assert!(!update.is_empty());
        assert!(PropertyUpdate::default().is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"city": "Evanston"}));
    }
}
