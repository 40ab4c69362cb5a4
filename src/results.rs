// Display shape of a prediction outcome, with prices formatted in Sri Lankan
// rupees the way the results panel shows them.

use serde::Serialize;

use crate::orchestrator::{PredictionOutcome, RequestState};

pub const FAILURE_NOTICE: &str = "Prediction failed, please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDisplay {
    pub estimated_value: String,
    pub range_min: String,
    pub range_max: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeView {
    pub state: RequestState,
    // "Processing..." indicator for the submit control.
    pub processing: bool,
    #[serde(flatten)]
    pub outcome: PredictionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<PriceDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

impl OutcomeView {
    pub fn new(state: RequestState, outcome: PredictionOutcome) -> Self {
        let display = match &outcome {
            PredictionOutcome::Success { price, interval } => Some(PriceDisplay {
                estimated_value: format_lkr(*price),
                range_min: format_lkr(interval.min),
                range_max: format_lkr(interval.max),
            }),
            _ => None,
        };
        let notice = outcome.is_failure().then_some(FAILURE_NOTICE);
        Self {
            state,
            processing: state == RequestState::Loading,
            outcome,
            display,
            notice,
        }
    }
}

/// Formats an amount as whole rupees with thousands separators,
/// e.g. `LKR 3,500,000`.
pub fn format_lkr(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("LKR {sign}{grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::ConfidenceInterval;
    use serde_json::json;

    #[test]
    fn formats_whole_rupees_with_grouping() {
        assert_eq!(format_lkr(3_500_000.0), "LKR 3,500,000");
        assert_eq!(format_lkr(999.0), "LKR 999");
        assert_eq!(format_lkr(1_000.0), "LKR 1,000");
        assert_eq!(format_lkr(2_745_000.55), "LKR 2,745,001");
        assert_eq!(format_lkr(0.0), "LKR 0");
        assert_eq!(format_lkr(-0.2), "LKR 0");
        assert_eq!(format_lkr(-12_345.0), "LKR -12,345");
    }

    #[test]
    fn success_view_carries_formatted_prices() {
        let view = OutcomeView::new(
            RequestState::Success,
            PredictionOutcome::Success {
                price: 3_500_000.0,
                interval: ConfidenceInterval {
                    min: 3_150_000.0,
                    max: 3_850_000.0,
                },
            },
        );

        assert_eq!(
            serde_json::to_value(&view).expect("serialize"),
            json!({
                "state": "success",
                "processing": false,
                "status": "success",
                "price": 3500000.0,
                "interval": { "min": 3150000.0, "max": 3850000.0 },
                "display": {
                    "estimatedValue": "LKR 3,500,000",
                    "rangeMin": "LKR 3,150,000",
                    "rangeMax": "LKR 3,850,000"
                }
            })
        );
    }

    #[test]
    fn failure_view_has_notice_and_no_price() {
        let view = OutcomeView::new(
            RequestState::Failed,
            PredictionOutcome::Failure {
                reason: "prediction service responded with status 500 Internal Server Error".to_string(),
            },
        );

        let body = serde_json::to_value(&view).expect("serialize");
        assert_eq!(body["status"], "failure");
        assert_eq!(body["notice"], FAILURE_NOTICE);
        assert!(body.get("price").is_none());
        assert!(body.get("display").is_none());
    }

    #[test]
    fn loading_view_reports_processing() {
        let view = OutcomeView::new(RequestState::Loading, PredictionOutcome::Pending);
        assert!(view.processing);
        assert!(view.notice.is_none());
    }
}
