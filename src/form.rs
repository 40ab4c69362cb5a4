// Form model: the editable draft of vehicle attributes and its normalization
// into a typed prediction request.

use std::{fmt, str::FromStr};

use chrono::Datelike;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    Brand, Condition, FeatureFlags, FormChoice, FuelType, NormalizedPredictionRequest, Transmission,
};

// Number of selectable model years, current year included.
pub const YEAR_WINDOW_LEN: i32 = 30;

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Names of the draft fields, as they appear in form posts and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Brand,
    Model,
    YearOfManufacture,
    Mileage,
    Engine,
    Fuel,
    Gear,
    Condition,
    Leasing,
    AirCondition,
    PowerSteering,
    PowerMirror,
    PowerWindow,
}

impl FieldName {
    pub const ALL: [FieldName; 13] = [
        FieldName::Brand,
        FieldName::Model,
        FieldName::YearOfManufacture,
        FieldName::Mileage,
        FieldName::Engine,
        FieldName::Fuel,
        FieldName::Gear,
        FieldName::Condition,
        FieldName::Leasing,
        FieldName::AirCondition,
        FieldName::PowerSteering,
        FieldName::PowerMirror,
        FieldName::PowerWindow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Brand => "brand",
            FieldName::Model => "model",
            FieldName::YearOfManufacture => "yom",
            FieldName::Mileage => "mileage",
            FieldName::Engine => "engine",
            FieldName::Fuel => "fuel",
            FieldName::Gear => "gear",
            FieldName::Condition => "condition",
            FieldName::Leasing => "leasing",
            FieldName::AirCondition => "aircon",
            FieldName::PowerSteering => "ps",
            FieldName::PowerMirror => "pm",
            FieldName::PowerWindow => "pw",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown form field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for FieldName {
    type Err = UnknownField;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| UnknownField(name.to_string()))
    }
}

/// Why a draft could not be turned into a prediction request.
#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("field '{0}' is required")]
    Missing(FieldName),
    #[error("field '{field}' expects a number, got '{raw}'")]
    InvalidNumber { field: FieldName, raw: String },
    #[error("field '{field}' must not be negative, got {value}")]
    Negative { field: FieldName, value: f64 },
    #[error("year {year} is outside the accepted range {earliest}-{latest}")]
    YearOutOfRange { year: i32, earliest: i32, latest: i32 },
    #[error("'{raw}' is not an option for field '{field}'")]
    UnknownOption { field: FieldName, raw: String },
    #[error("field '{field}' expects a yes/no value, got '{raw}'")]
    InvalidFlag { field: FieldName, raw: String },
}

impl FormError {
    pub fn field(&self) -> Option<FieldName> {
        match self {
            FormError::Missing(field)
            | FormError::InvalidNumber { field, .. }
            | FormError::Negative { field, .. }
            | FormError::UnknownOption { field, .. }
            | FormError::InvalidFlag { field, .. } => Some(*field),
            FormError::YearOutOfRange { .. } => Some(FieldName::YearOfManufacture),
        }
    }
}

/// The raw, unvalidated form state. Every field keeps exactly what the user
/// typed or picked until normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleAttributes {
    pub brand: String,
    pub model: String,
    #[serde(rename = "yom")]
    pub year_of_manufacture: String,
    pub mileage: String,
    pub engine: String,
    pub fuel: String,
    pub gear: String,
    pub condition: String,
    pub leasing: String,
    pub aircon: String,
    pub ps: String,
    pub pm: String,
    pub pw: String,
}

impl VehicleAttributes {
    // Choices start empty so the user has to pick them; the year starts at the
    // newest model year and lease/equipment flags start as "0".
    pub fn with_defaults(current_year: i32) -> Self {
        Self {
            brand: String::new(),
            model: String::new(),
            year_of_manufacture: current_year.to_string(),
            mileage: String::new(),
            engine: String::new(),
            fuel: String::new(),
            gear: String::new(),
            condition: String::new(),
            leasing: "0".to_string(),
            aircon: "0".to_string(),
            ps: "0".to_string(),
            pm: "0".to_string(),
            pw: "0".to_string(),
        }
    }

    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::Brand => &self.brand,
            FieldName::Model => &self.model,
            FieldName::YearOfManufacture => &self.year_of_manufacture,
            FieldName::Mileage => &self.mileage,
            FieldName::Engine => &self.engine,
            FieldName::Fuel => &self.fuel,
            FieldName::Gear => &self.gear,
            FieldName::Condition => &self.condition,
            FieldName::Leasing => &self.leasing,
            FieldName::AirCondition => &self.aircon,
            FieldName::PowerSteering => &self.ps,
            FieldName::PowerMirror => &self.pm,
            FieldName::PowerWindow => &self.pw,
        }
    }

    fn slot_mut(&mut self, field: FieldName) -> &mut String {
        match field {
            FieldName::Brand => &mut self.brand,
            FieldName::Model => &mut self.model,
            FieldName::YearOfManufacture => &mut self.year_of_manufacture,
            FieldName::Mileage => &mut self.mileage,
            FieldName::Engine => &mut self.engine,
            FieldName::Fuel => &mut self.fuel,
            FieldName::Gear => &mut self.gear,
            FieldName::Condition => &mut self.condition,
            FieldName::Leasing => &mut self.leasing,
            FieldName::AirCondition => &mut self.aircon,
            FieldName::PowerSteering => &mut self.ps,
            FieldName::PowerMirror => &mut self.pm,
            FieldName::PowerWindow => &mut self.pw,
        }
    }
}

/// The sliding window of selectable model years, ending at `latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    latest: i32,
}

impl YearWindow {
    pub fn ending_at(latest: i32) -> Self {
        Self { latest }
    }

    pub fn latest(self) -> i32 {
        self.latest
    }

    pub fn earliest(self) -> i32 {
        self.latest - (YEAR_WINDOW_LEN - 1)
    }

    pub fn contains(self, year: i32) -> bool {
        (self.earliest()..=self.latest).contains(&year)
    }

    // Most recent first, matching the order of the year picker.
    pub fn years(self) -> Vec<i32> {
        (self.earliest()..=self.latest).rev().collect()
    }
}

/// Owns one draft for the lifetime of a form instance.
///
/// The year window is evaluated when the draft is normalized, so a long-lived
/// form accepts the same years that `FormOptions::current` offers.
#[derive(Debug, Clone)]
pub struct FormModel {
    draft: VehicleAttributes,
    // `None` follows the calendar.
    pinned_year: Option<i32>,
}

impl Default for FormModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FormModel {
    pub fn new() -> Self {
        Self {
            pinned_year: None,
            ..Self::for_year(current_year())
        }
    }

    /// A form whose year window always ends at `year`.
    pub fn for_year(year: i32) -> Self {
        Self {
            draft: VehicleAttributes::with_defaults(year),
            pinned_year: Some(year),
        }
    }

    pub fn window(&self) -> YearWindow {
        YearWindow::ending_at(self.pinned_year.unwrap_or_else(current_year))
    }

    pub fn draft(&self) -> &VehicleAttributes {
        &self.draft
    }

    /// Replaces the raw value of one field. Nothing else in the draft changes.
    pub fn update_field(&mut self, field: FieldName, raw: impl Into<String>) {
        *self.draft.slot_mut(field) = raw.into();
        tracing::debug!("Form field '{}' updated to '{}'", field, self.draft.get(field));
    }

    /// Coerces the draft into a typed request, reporting the first field that
    /// cannot be coerced.
    pub fn normalize(&self) -> Result<NormalizedPredictionRequest, FormError> {
        let draft = &self.draft;

        let model = draft.model.trim();
        if model.is_empty() {
            return Err(FormError::Missing(FieldName::Model));
        }

        let year_of_manufacture = parse_year(&draft.year_of_manufacture)?;
        let window = self.window();
        if !window.contains(year_of_manufacture) {
            return Err(FormError::YearOutOfRange {
                year: year_of_manufacture,
                earliest: window.earliest(),
                latest: window.latest(),
            });
        }

        Ok(NormalizedPredictionRequest {
            brand: parse_choice::<Brand>(FieldName::Brand, &draft.brand)?,
            model: model.to_uppercase(),
            year_of_manufacture,
            mileage_km: parse_measure(FieldName::Mileage, &draft.mileage)?,
            engine_capacity_cc: parse_measure(FieldName::Engine, &draft.engine)?,
            fuel_type: parse_choice::<FuelType>(FieldName::Fuel, &draft.fuel)?,
            transmission: parse_choice::<Transmission>(FieldName::Gear, &draft.gear)?,
            condition: parse_choice::<Condition>(FieldName::Condition, &draft.condition)?,
            leasing_status: parse_flag(FieldName::Leasing, &draft.leasing)?,
            features: FeatureFlags {
                air_condition: parse_flag(FieldName::AirCondition, &draft.aircon)?,
                power_steering: parse_flag(FieldName::PowerSteering, &draft.ps)?,
                power_mirror: parse_flag(FieldName::PowerMirror, &draft.pm)?,
                power_window: parse_flag(FieldName::PowerWindow, &draft.pw)?,
            },
        })
    }
}

// Non-negative, finite decimal (mileage, engine capacity).
fn parse_measure(field: FieldName, raw: &str) -> Result<f64, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormError::Missing(field));
    }
    let value = trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| FormError::InvalidNumber {
            field,
            raw: raw.to_string(),
        })?;
    if value < 0.0 {
        return Err(FormError::Negative { field, value });
    }
    Ok(value)
}

fn parse_year(raw: &str) -> Result<i32, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormError::Missing(FieldName::YearOfManufacture));
    }
    trimmed.parse::<i32>().map_err(|_| FormError::InvalidNumber {
        field: FieldName::YearOfManufacture,
        raw: raw.to_string(),
    })
}

fn parse_choice<T: FormChoice>(field: FieldName, raw: &str) -> Result<T, FormError> {
    if raw.trim().is_empty() {
        return Err(FormError::Missing(field));
    }
    T::from_raw(raw).ok_or_else(|| FormError::UnknownOption {
        field,
        raw: raw.to_string(),
    })
}

// An untouched flag means "not available".
fn parse_flag(field: FieldName, raw: &str) -> Result<bool, FormError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(FormError::InvalidFlag {
            field,
            raw: raw.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl ChoiceOption {
    fn all<T: FormChoice>() -> Vec<ChoiceOption> {
        T::ALL
            .iter()
            .map(|choice| ChoiceOption {
                value: choice.value(),
                label: choice.label(),
            })
            .collect()
    }
}

/// Everything a client needs to render the form's pickers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub brands: Vec<ChoiceOption>,
    pub years: Vec<i32>,
    pub fuel_types: Vec<ChoiceOption>,
    pub transmissions: Vec<ChoiceOption>,
    pub conditions: Vec<ChoiceOption>,
    pub leasing: Vec<ChoiceOption>,
    pub features: Vec<ChoiceOption>,
}

impl FormOptions {
    pub fn current() -> Self {
        Self::for_year(current_year())
    }

    pub fn for_year(current_year: i32) -> Self {
        Self {
            brands: ChoiceOption::all::<Brand>(),
            years: YearWindow::ending_at(current_year).years(),
            fuel_types: ChoiceOption::all::<FuelType>(),
            transmissions: ChoiceOption::all::<Transmission>(),
            conditions: ChoiceOption::all::<Condition>(),
            leasing: vec![
                ChoiceOption { value: "0", label: "No Leasing" },
                ChoiceOption { value: "1", label: "Ongoing Lease" },
            ],
            features: vec![
                ChoiceOption { value: "aircon", label: "Air Condition" },
                ChoiceOption { value: "ps", label: "Power Steering" },
                ChoiceOption { value: "pm", label: "Power Mirror" },
                ChoiceOption { value: "pw", label: "Power Window" },
            ],
        }
    }
}
