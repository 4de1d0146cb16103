use crate::domain::errors::EstimatorError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Feature names expected by the floor price model.
/// These keys MUST match the feature columns the model was exported with.
/// Any change here is a breaking change for deployed models.
pub const FEATURE_NAMES: &[&str] = &[
    "inventory_id",
    "request_type",
    "ex_floor_price",
    "state_code",
    "country_code",
    "city_code",
    "device_os",
    "device_os_version",
    "hour_of_day",
];

pub const EX_FLOOR_PRICE: &str = "ex_floor_price";

/// A single typed feature value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Raw UTF-8 bytes of a categorical signal
    String(Vec<u8>),
    /// Numeric signal, always a one-element list for this model
    Float(Vec<f32>),
}

impl FeatureValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FeatureValue::String(bytes) => Some(bytes),
            FeatureValue::Float(_) => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            FeatureValue::Float(values) => Some(values),
            FeatureValue::String(_) => None,
        }
    }
}

/// Canonical named-feature record for one prediction.
///
/// Always holds exactly the keys in [`FEATURE_NAMES`]. The only way to build
/// one is [`encode`], so the record cannot be mutated into another shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    features: HashMap<&'static str, FeatureValue>,
}

impl FeatureRecord {
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FeatureValue)> {
        self.features.iter().map(|(name, value)| (*name, value))
    }
}

/// Caller-supplied signals for one auction request.
///
/// `ex_floor_price` is optional so that a missing value from JSON or CSV input
/// reaches the encoder and is rejected there instead of being defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPriceRequest {
    pub inventory_id: String,
    pub request_type: String,
    pub ex_floor_price: Option<f32>,
    pub state_code: String,
    pub country_code: String,
    pub city_code: String,
    pub device_os: String,
    pub device_os_version: String,
    pub hour_of_day: String,
}

impl FloorPriceRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inventory_id: impl Into<String>,
        request_type: impl Into<String>,
        ex_floor_price: f32,
        state_code: impl Into<String>,
        country_code: impl Into<String>,
        city_code: impl Into<String>,
        device_os: impl Into<String>,
        device_os_version: impl Into<String>,
        hour_of_day: impl Into<String>,
    ) -> Self {
        Self {
            inventory_id: inventory_id.into(),
            request_type: request_type.into(),
            ex_floor_price: Some(ex_floor_price),
            state_code: state_code.into(),
            country_code: country_code.into(),
            city_code: city_code.into(),
            device_os: device_os.into(),
            device_os_version: device_os_version.into(),
            hour_of_day: hour_of_day.into(),
        }
    }
}

/// Checks the numeric signal without building a record.
pub fn validate_floor_price(value: Option<f32>) -> Result<f32, EstimatorError> {
    match value {
        None => Err(EstimatorError::InvalidInput {
            field: EX_FLOOR_PRICE,
            reason: "value is missing".to_string(),
        }),
        Some(v) if v.is_nan() => Err(EstimatorError::InvalidInput {
            field: EX_FLOOR_PRICE,
            reason: "value is NaN".to_string(),
        }),
        Some(v) if v.is_infinite() => Err(EstimatorError::InvalidInput {
            field: EX_FLOOR_PRICE,
            reason: format!("value is {} infinity", if v > 0.0 { "+" } else { "-" }),
        }),
        Some(v) => Ok(v),
    }
}

/// Converts caller signals into the canonical feature record.
/// String signals are copied verbatim, no format checks are applied.
pub fn encode(request: &FloorPriceRequest) -> Result<FeatureRecord, EstimatorError> {
    let ex_floor_price = validate_floor_price(request.ex_floor_price)?;

    let text = |value: &str| FeatureValue::String(value.as_bytes().to_vec());

    let features = HashMap::from([
        ("inventory_id", text(&request.inventory_id)),
        ("request_type", text(&request.request_type)),
        (EX_FLOOR_PRICE, FeatureValue::Float(vec![ex_floor_price])),
        ("state_code", text(&request.state_code)),
        ("country_code", text(&request.country_code)),
        ("city_code", text(&request.city_code)),
        ("device_os", text(&request.device_os)),
        ("device_os_version", text(&request.device_os_version)),
        ("hour_of_day", text(&request.hour_of_day)),
    ]);

    Ok(FeatureRecord { features })
}
