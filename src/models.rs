// Data structures shared between the form, the prediction client and the API.
// Wire names follow the prediction service's `/predict` schema.

use serde::{Deserialize, Serialize, Serializer};

/// A closed set of choices offered by the form.
///
/// `value` is what travels to the prediction service, `label` is what a user
/// sees. Parsing accepts either, ignoring ASCII case.
pub trait FormChoice: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn value(self) -> &'static str;
    fn label(self) -> &'static str;

    fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|choice| {
                choice.value().eq_ignore_ascii_case(raw) || choice.label().eq_ignore_ascii_case(raw)
            })
    }
}

// Declares a choice enum together with its FormChoice and Serialize impls.
macro_rules! form_choice {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($value:expr, $label:expr)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl FormChoice for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn value(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.value())
            }
        }
    };
}

form_choice! {
    /// Manufacturers the prediction model was trained on.
    Brand {
        Toyota => ("TOYOTA", "Toyota"),
        Nissan => ("NISSAN", "Nissan"),
        Honda => ("HONDA", "Honda"),
        Suzuki => ("SUZUKI", "Suzuki"),
        Mitsubishi => ("MITSUBISHI", "Mitsubishi"),
        Mazda => ("MAZDA", "Mazda"),
        Bmw => ("BMW", "BMW"),
        Mercedes => ("MERCEDES", "Mercedes-Benz"),
        Audi => ("AUDI", "Audi"),
        Hyundai => ("HYUNDAI", "Hyundai"),
    }
}

form_choice! {
    FuelType {
        Petrol => ("Petrol", "Petrol"),
        Diesel => ("Diesel", "Diesel"),
        Hybrid => ("Hybrid", "Hybrid"),
        Electric => ("Electric", "Electric"),
    }
}

form_choice! {
    /// Gearbox. The service knows automatic gearboxes as "Auto".
    Transmission {
        Manual => ("Manual", "Manual"),
        Automatic => ("Auto", "Automatic"),
    }
}

form_choice! {
    Condition {
        New => ("NEW", "New"),
        Used => ("USED", "Used"),
    }
}

// Booleans travel as 0/1 integers, which is what the service's schema expects.
fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Optional equipment. Every flag defaults to "not available".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeatureFlags {
    #[serde(rename = "aircon", serialize_with = "as_flag")]
    pub air_condition: bool,
    #[serde(rename = "ps", serialize_with = "as_flag")]
    pub power_steering: bool,
    #[serde(rename = "pm", serialize_with = "as_flag")]
    pub power_mirror: bool,
    #[serde(rename = "pw", serialize_with = "as_flag")]
    pub power_window: bool,
}

/// The typed, transport-ready body sent to the prediction service.
///
/// Only ever built by [`crate::form::FormModel::normalize`], so every numeric
/// field is finite and non-negative and `model` is upper-case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPredictionRequest {
    pub brand: Brand,
    pub model: String,
    #[serde(rename = "yom")]
    pub year_of_manufacture: i32,
    #[serde(rename = "mileage")]
    pub mileage_km: f64,
    #[serde(rename = "engine")]
    pub engine_capacity_cc: f64,
    #[serde(rename = "fuel")]
    pub fuel_type: FuelType,
    #[serde(rename = "gear")]
    pub transmission: Transmission,
    pub condition: Condition,
    #[serde(rename = "leasing", serialize_with = "as_flag")]
    pub leasing_status: bool,
    #[serde(flatten)]
    pub features: FeatureFlags,
}

// Response body of the prediction service. The reference backend names the
// field "Predicted Price"; newer deployments use "predictedPrice".
#[derive(Debug, Deserialize)]
pub struct PredictionResponse {
    #[serde(rename = "predictedPrice", alias = "Predicted Price")]
    pub predicted_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choices_parse_by_value_or_label_ignoring_case() {
        assert_eq!(Brand::from_raw("Toyota"), Some(Brand::Toyota));
        assert_eq!(Brand::from_raw("mercedes-benz"), Some(Brand::Mercedes));
        assert_eq!(Transmission::from_raw("Automatic"), Some(Transmission::Automatic));
        assert_eq!(Transmission::from_raw("auto"), Some(Transmission::Automatic));
        assert_eq!(Condition::from_raw(" used "), Some(Condition::Used));
        assert_eq!(FuelType::from_raw("Kerosene"), None);
        assert_eq!(Brand::from_raw(""), None);
    }

    #[test]
    fn request_serializes_to_service_schema() {
        let request = NormalizedPredictionRequest {
            brand: Brand::Suzuki,
            model: "WAGON R".to_string(),
            year_of_manufacture: 2018,
            mileage_km: 100_000.0,
            engine_capacity_cc: 660.0,
            fuel_type: FuelType::Petrol,
            transmission: Transmission::Automatic,
            condition: Condition::Used,
            leasing_status: true,
            features: FeatureFlags {
                air_condition: true,
                power_steering: true,
                power_mirror: false,
                power_window: false,
            },
        };

        let body = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(
            body,
            json!({
                "brand": "SUZUKI",
                "model": "WAGON R",
                "yom": 2018,
                "mileage": 100000.0,
                "engine": 660.0,
                "fuel": "Petrol",
                "gear": "Auto",
                "condition": "USED",
                "leasing": 1,
                "aircon": 1,
                "ps": 1,
                "pm": 0,
                "pw": 0
            })
        );
    }

    #[test]
    fn response_accepts_both_price_keys() {
        let camel: PredictionResponse =
            serde_json::from_value(json!({ "predictedPrice": 3500000 })).expect("camel case key");
        assert_eq!(camel.predicted_price, 3_500_000.0);

        let legacy: PredictionResponse =
            serde_json::from_value(json!({ "Predicted Price": 2745000.5 })).expect("legacy key");
        assert_eq!(legacy.predicted_price, 2_745_000.5);

        assert!(serde_json::from_value::<PredictionResponse>(json!({})).is_err());
        assert!(serde_json::from_value::<PredictionResponse>(json!({ "predictedPrice": "a lot" })).is_err());
    }
}
