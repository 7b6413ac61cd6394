use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Classifier output for the fourteen conditions, in canonical label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionsReq {
    #[schema(min_items = 14, max_items = 14)]
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionRes {
    pub label: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionsRes {
    pub conditions: Vec<ConditionRes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisRes {
    pub label: String,
    pub probability: f64,
    pub threshold: f64,
    /// 1 when probability is strictly greater than the threshold, else 0.
    pub diagnosis: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosesRes {
    pub diagnoses: Vec<DiagnosisRes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictions_req_uses_predictions_key() {
        let req: PredictionsReq = serde_json::from_str(r#"{"predictions": [0.1, 0.2]}"#).unwrap();
        assert_eq!(req.predictions, vec![0.1, 0.2]);
        assert!(serde_json::from_str::<PredictionsReq>(r#"{"scores": []}"#).is_err());
    }

    #[test]
    fn diagnosis_res_shape() {
        let res = DiagnosisRes {
            label: "Mass".into(),
            probability: 0.8,
            threshold: 0.7143,
            diagnosis: 1,
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["diagnosis"], 1);
        assert_eq!(json["label"], "Mass");
    }
}
