use crate::errors::AppError;
use crate::models::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A pretrained lead classification model.
pub trait LeadModel: Send + Sync {
    /// Ordered input feature names the model was trained on, if recorded.
    fn feature_names(&self) -> Option<&[String]>;

    /// Whether [`LeadModel::predict_proba`] is available.
    fn has_predict_proba(&self) -> bool {
        false
    }

    /// Probability of the positive class, one per row.
    fn predict_proba(&self, _features: &FeatureMatrix) -> Result<Vec<f64>, AppError> {
        Err(AppError::ModelError(
            "model has no probability interface".to_string(),
        ))
    }

    /// Raw prediction, one per row.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearKind {
    /// Sigmoid output, exposes probabilities.
    Logistic,
    /// Plain weighted sum, prediction only.
    Linear,
}

/// Linear model loaded from exported weights.
///
/// ```json
/// {"kind": "logistic", "feature_names": ["employee_count"], "coefficients": [0.01], "intercept": -1.2}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub kind: LinearKind,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let model: LinearModel = serde_json::from_str(json)
            .map_err(|e| AppError::ModelError(format!("Invalid model artifact: {}", e)))?;

        if let Some(names) = &model.feature_names {
            if names.len() != model.coefficients.len() {
                return Err(AppError::ModelError(format!(
                    "Model lists {} feature names but {} coefficients",
                    names.len(),
                    model.coefficients.len()
                )));
            }
        }
        if model.coefficients.iter().any(|c| !c.is_finite()) || !model.intercept.is_finite() {
            return Err(AppError::ModelError(
                "Model weights must be finite".to_string(),
            ));
        }

        Ok(model)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::ModelError(format!("Failed to read model {}: {}", path.display(), e))
        })?;
        let model = Self::from_json(&json)?;
        tracing::info!(
            "Loaded {:?} model from {} ({} features)",
            model.kind,
            path.display(),
            model.coefficients.len()
        );
        Ok(model)
    }

    fn decision(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError> {
        if features.width() != self.coefficients.len() {
            return Err(AppError::ModelError(format!(
                "Model expects {} features, got {}",
                self.coefficients.len(),
                features.width()
            )));
        }

        Ok(features
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.coefficients)
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + self.intercept
            })
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LeadModel for LinearModel {
    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn has_predict_proba(&self) -> bool {
        self.kind == LinearKind::Logistic
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError> {
        if self.kind != LinearKind::Logistic {
            return Err(AppError::ModelError(
                "linear model has no probability interface".to_string(),
            ));
        }
        Ok(self.decision(features)?.into_iter().map(sigmoid).collect())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, AppError> {
        let decision = self.decision(features)?;
        Ok(match self.kind {
            LinearKind::Logistic => decision
                .into_iter()
                .map(|z| if sigmoid(z) >= 0.5 { 1.0 } else { 0.0 })
                .collect(),
            LinearKind::Linear => decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(columns: &[&str], rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_logistic_probability() {
        let model = LinearModel::from_json(
            r#"{"kind": "logistic", "feature_names": ["a", "b"], "coefficients": [1.0, -1.0], "intercept": 0.0}"#,
        )
        .unwrap();

        let probs = model
            .predict_proba(&matrix(&["a", "b"], vec![vec![2.0, 2.0], vec![0.0, 0.0]]))
            .unwrap();

        assert!(model.has_predict_proba());
        assert_eq!(probs, vec![0.5, 0.5]);
        assert_eq!(model.feature_names().unwrap().len(), 2);
    }

    #[test]
    fn test_linear_model_has_no_probabilities() {
        let model =
            LinearModel::from_json(r#"{"kind": "linear", "coefficients": [0.1], "intercept": 0.2}"#)
                .unwrap();

        assert!(!model.has_predict_proba());
        assert!(model.feature_names().is_none());
        assert!(model.predict_proba(&matrix(&["a"], vec![vec![1.0]])).is_err());
        let out = model.predict(&matrix(&["a"], vec![vec![3.0]])).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch_is_model_error() {
        let model =
            LinearModel::from_json(r#"{"kind": "linear", "coefficients": [0.1, 0.2]}"#).unwrap();
        let err = model.predict(&matrix(&["a"], vec![vec![1.0]])).unwrap_err();
        assert!(matches!(err, AppError::ModelError(_)));
    }

    #[test]
    fn test_artifact_validation() {
        assert!(LinearModel::from_json(
            r#"{"kind": "logistic", "feature_names": ["a"], "coefficients": [1.0, 2.0]}"#
        )
        .is_err());
        assert!(LinearModel::from_json(r#"{"kind": "forest", "coefficients": []}"#).is_err());
        assert!(LinearModel::from_path("/nonexistent/model.json").is_err());
    }
}
