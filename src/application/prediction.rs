//! Prediction service: Orchestrates one risk prediction.
//!
//! This service coordinates:
//! - History lookup (identified users only)
//! - Feature derivation
//! - Vectorization and scaling
//! - Classification
//! - Risk factor explanation

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::adapters::{LinearSoftmaxClassifier, ModelArtifacts};
use crate::application::{FeatureDeriver, FeatureVectorizer, RiskExplainer};
use crate::domain::{
    ClassProbabilities, FeatureMap, HistoricalSnapshot, ModelMetadata, PredictionResult, Reading,
    RiskLevel, ServiceHealth,
};
use crate::ports::{ClassifierError, HistoryRepository, RiskClassifier};

/// Default history lookback for identified users.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Tolerance when checking that class probabilities sum to one.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Service for running risk predictions.
///
/// The classifier, vectorizer and metadata are loaded once and shared
/// read-only; `predict` takes `&self` and may run concurrently.
pub struct PredictionService<C, H>
where
    C: RiskClassifier,
    H: HistoryRepository,
{
    classifier: Arc<C>,
    history: Arc<H>,
    vectorizer: Arc<FeatureVectorizer>,
    metadata: Arc<ModelMetadata>,
    deriver: FeatureDeriver,
    explainer: RiskExplainer,
    lookback: Duration,
}

impl<C, H> PredictionService<C, H>
where
    C: RiskClassifier,
    H: HistoryRepository,
{
    /// Create a new prediction service.
    ///
    /// # Errors
    /// Returns `ClassifierError::ClassOrder` if the classifier's class labels
    /// are not exactly `Low, Medium, High` in that order.
    pub fn new(
        classifier: Arc<C>,
        history: Arc<H>,
        vectorizer: Arc<FeatureVectorizer>,
        metadata: Arc<ModelMetadata>,
        lookback_days: u32,
    ) -> crate::Result<Self> {
        verify_class_order(classifier.as_ref())?;

        tracing::info!(
            model_version = %metadata.model_version,
            model_type = %metadata.best_model,
            features = vectorizer.feature_names().len(),
            "Prediction service ready"
        );

        Ok(Self {
            classifier,
            history,
            vectorizer,
            metadata,
            deriver: FeatureDeriver::new(),
            explainer: RiskExplainer::new(),
            lookback: Duration::days(i64::from(lookback_days.max(1))),
        })
    }

    /// Score a reading, using the user's recent history when `user_id` is given.
    ///
    /// # Errors
    /// Returns error only if the classifier fails or returns malformed output.
    /// Missing history and malformed reading fields are absorbed.
    pub fn predict(
        &self,
        reading: &Reading,
        user_id: Option<&str>,
    ) -> crate::Result<PredictionResult> {
        tracing::debug!("Step 1: Deriving features...");
        let features = match user_id {
            Some(id) => {
                let history = self.load_history(id);
                self.deriver.derive(reading, history.as_deref())
            }
            None => self.deriver.derive(reading, None),
        };

        tracing::debug!("Step 2: Vectorizing {} features...", features.len());
        let vector = self.vectorizer.vectorize(&features);

        tracing::debug!("Step 3: Classifying...");
        let class_id = self.classifier.predict(&vector)?;
        let probabilities = normalize_probabilities(&self.classifier.predict_proba(&vector)?)?;

        let risk_level = RiskLevel::from_class_id(class_id);
        if risk_level == RiskLevel::Unknown {
            tracing::warn!(class_id, "Classifier returned an unmapped class id");
        }

        let result = self.assemble(risk_level, probabilities, &features);

        tracing::info!(
            "Prediction made: {} (confidence: {:.3})",
            result.risk_level,
            result.confidence
        );

        Ok(result)
    }

    /// Model liveness summary.
    #[must_use]
    pub fn health(&self) -> ServiceHealth {
        ServiceHealth {
            status: "healthy".to_string(),
            model_version: self.metadata.model_version.clone(),
            model_type: self.metadata.best_model.clone(),
            feature_count: self.vectorizer.feature_names().len(),
            timestamp: Utc::now(),
        }
    }

    /// Fetch the lookback window; a repository failure degrades to no history.
    fn load_history(&self, user_id: &str) -> Option<Vec<HistoricalSnapshot>> {
        let Some(since) = Utc::now().checked_sub_signed(self.lookback) else {
            tracing::warn!(
                "History lookback of {} days is out of range, predicting without it",
                self.lookback.num_days()
            );
            return None;
        };
        match self.history.fetch_since(user_id, since) {
            Ok(snapshots) => {
                tracing::debug!("Loaded {} historical snapshots", snapshots.len());
                Some(snapshots)
            }
            Err(e) => {
                tracing::warn!("History unavailable, predicting without it: {}", e);
                None
            }
        }
    }

    fn assemble(
        &self,
        risk_level: RiskLevel,
        probabilities: ClassProbabilities,
        features: &FeatureMap,
    ) -> PredictionResult {
        let risk_factors = self.explainer.identify_risk_factors(features);
        let explanation = self.explainer.explain(risk_level, &risk_factors);

        PredictionResult {
            risk_level,
            confidence: probabilities.max(),
            risk_factors,
            explanation,
            probabilities,
            timestamp: Utc::now(),
        }
    }
}

impl<H> PredictionService<LinearSoftmaxClassifier, H>
where
    H: HistoryRepository,
{
    /// Build a service from a loaded artifact directory.
    ///
    /// # Errors
    /// Returns error if the artifacts are inconsistent or the class order is wrong.
    pub fn from_artifacts(
        artifacts: ModelArtifacts,
        history: Arc<H>,
        lookback_days: u32,
    ) -> crate::Result<Self> {
        let vectorizer = FeatureVectorizer::new(artifacts.feature_names, artifacts.scaler)?;
        Self::new(
            Arc::new(artifacts.classifier),
            history,
            Arc::new(vectorizer),
            Arc::new(artifacts.metadata),
            lookback_days,
        )
    }
}

/// Refuse classifiers whose columns are not `[Low, Medium, High]`, by label
/// and by the class id each column predicts.
fn verify_class_order<C: RiskClassifier + ?Sized>(
    classifier: &C,
) -> Result<(), ClassifierError> {
    let expected: Vec<String> = RiskLevel::CLASSES
        .iter()
        .map(|l| l.label().to_string())
        .collect();
    if classifier.class_labels() != expected.as_slice() {
        return Err(ClassifierError::ClassOrder {
            expected,
            actual: classifier.class_labels().to_vec(),
        });
    }

    let ids = classifier.class_ids();
    let ids_match = ids.len() == RiskLevel::CLASSES.len()
        && ids
            .iter()
            .zip(RiskLevel::CLASSES)
            .all(|(id, level)| RiskLevel::from_class_id(*id) == level);
    if !ids_match {
        return Err(ClassifierError::ClassOrder {
            expected,
            actual: ids
                .iter()
                .map(|id| RiskLevel::from_class_id(*id).label().to_string())
                .collect(),
        });
    }
    Ok(())
}

/// Check a raw probability row and map it onto the three class names.
fn normalize_probabilities(raw: &[f64]) -> Result<ClassProbabilities, ClassifierError> {
    if raw.len() != RiskLevel::CLASSES.len() {
        return Err(ClassifierError::InvalidProbabilities(format!(
            "expected {} classes, got {}",
            RiskLevel::CLASSES.len(),
            raw.len()
        )));
    }
    if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ClassifierError::InvalidProbabilities(
            "probabilities must be finite and non-negative".into(),
        ));
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(ClassifierError::InvalidProbabilities(
            "probabilities sum to zero".into(),
        ));
    }
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        tracing::debug!(total, "Renormalizing class probabilities");
    }
    Ok(ClassProbabilities::new(
        raw[0] / total,
        raw[1] / total,
        raw[2] / total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteHistory;
    use crate::domain::{FeatureVector, StandardScaler};
    use crate::VitalRiskError;
    use chrono::DateTime;
    use serde_json::json;
    use std::sync::Mutex;

    /// Classifier double returning a fixed answer and recording its inputs.
    struct FixedClassifier {
        class_id: i64,
        proba: Vec<f64>,
        labels: Vec<String>,
        ids: Vec<i64>,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl FixedClassifier {
        fn new(class_id: i64, proba: Vec<f64>) -> Self {
            Self {
                class_id,
                proba,
                labels: vec!["Low".into(), "Medium".into(), "High".into()],
                ids: vec![0, 1, 2],
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl RiskClassifier for FixedClassifier {
        fn predict(&self, features: &FeatureVector) -> Result<i64, ClassifierError> {
            self.seen
                .lock()
                .expect("lock")
                .push(features.as_slice().to_vec());
            Ok(self.class_id)
        }

        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>, ClassifierError> {
            Ok(self.proba.clone())
        }

        fn class_labels(&self) -> &[String] {
            &self.labels
        }

        fn class_ids(&self) -> &[i64] {
            &self.ids
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("store offline")]
    struct Offline;

    /// Repository double that always fails.
    struct OfflineHistory;

    impl HistoryRepository for OfflineHistory {
        type Error = Offline;

        fn fetch_since(
            &self,
            _user_id: &str,
            _since: DateTime<Utc>,
        ) -> Result<Vec<HistoricalSnapshot>, Self::Error> {
            Err(Offline)
        }
    }

    const SCHEMA: [&str; 16] = [
        "heart_rate",
        "bp_systolic",
        "bp_diastolic",
        "glucose",
        "sleep_hours",
        "temperature",
        "oxygen_level",
        "age",
        "bmi_estimate",
        "delta_sys_3d",
        "delta_dia_3d",
        "delta_sugar_3d",
        "delta_hr_3d",
        "std_sys_7d",
        "bp_ratio",
        "heart_rate_category",
    ];

    fn identity_vectorizer() -> Arc<FeatureVectorizer> {
        Arc::new(
            FeatureVectorizer::new(
                SCHEMA.iter().map(|s| s.to_string()).collect(),
                StandardScaler {
                    mean: vec![0.0; SCHEMA.len()],
                    scale: vec![1.0; SCHEMA.len()],
                },
            )
            .expect("Valid vectorizer"),
        )
    }

    fn metadata() -> Arc<ModelMetadata> {
        Arc::new(ModelMetadata {
            model_version: "1.0.0".into(),
            best_model: "LogisticRegression".into(),
            trained_at: None,
        })
    }

    fn service_with<H: HistoryRepository>(
        classifier: Arc<FixedClassifier>,
        history: Arc<H>,
    ) -> PredictionService<FixedClassifier, H> {
        PredictionService::new(
            classifier,
            history,
            identity_vectorizer(),
            metadata(),
            DEFAULT_LOOKBACK_DAYS,
        )
        .expect("Should build service")
    }

    fn scenario_a() -> Reading {
        Reading::new()
            .with("heart_rate", 120)
            .with("bp_systolic", 150)
            .with("bp_diastolic", 95)
            .with("glucose", 160)
            .with("sleep_hours", 5)
    }

    #[test]
    fn test_scenario_a_high_risk() {
        let classifier = Arc::new(FixedClassifier::new(2, vec![0.05, 0.15, 0.8]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = service_with(classifier, storage);

        let result = service.predict(&scenario_a(), None).expect("Should predict");

        assert_eq!(result.risk_level, RiskLevel::High);
        assert!((result.confidence - 0.8).abs() < 1e-12);
        assert_eq!(
            result.risk_factors,
            vec![
                "High heart rate (tachycardia)",
                "High systolic blood pressure",
                "High diastolic blood pressure",
                "Elevated blood glucose",
                "Insufficient sleep",
            ]
        );
        assert_eq!(
            result.explanation,
            "High risk detected due to multiple factors: High heart rate (tachycardia), \
             High systolic blood pressure, High diastolic blood pressure. \
             Immediate medical attention recommended."
        );
    }

    #[test]
    fn test_scenario_b_defaults_low_risk() {
        let classifier = Arc::new(FixedClassifier::new(0, vec![0.9, 0.08, 0.02]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = service_with(classifier, storage);

        let reading = Reading::new()
            .with("heart_rate", 75)
            .with("bp_systolic", 120)
            .with("bp_diastolic", 80)
            .with("glucose", 100)
            .with("sleep_hours", 7);
        let result = service.predict(&reading, None).expect("Should predict");

        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.risk_factors.is_empty());
        assert_eq!(
            result.explanation,
            "Low risk level. Health parameters appear normal. Continue healthy lifestyle practices."
        );
        assert!((result.probabilities.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unmapped_class_is_unknown() {
        let classifier = Arc::new(FixedClassifier::new(7, vec![0.2, 0.3, 0.5]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = service_with(classifier, storage);

        let result = service.predict(&Reading::new(), None).expect("Should predict");
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probabilities_are_renormalized() {
        let classifier = Arc::new(FixedClassifier::new(1, vec![2.0, 6.0, 2.0]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = service_with(classifier, storage);

        let result = service.predict(&Reading::new(), None).expect("Should predict");
        assert!((result.probabilities.total() - 1.0).abs() < 1e-6);
        assert!((result.probabilities.medium - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_probabilities_fail() {
        for proba in [vec![0.5, 0.5], vec![0.5, f64::NAN, 0.5], vec![0.0, 0.0, 0.0]] {
            let classifier = Arc::new(FixedClassifier::new(0, proba));
            let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
            let service = service_with(classifier, storage);
            assert!(matches!(
                service.predict(&Reading::new(), None),
                Err(VitalRiskError::Classifier(ClassifierError::InvalidProbabilities(_)))
            ));
        }
    }

    #[test]
    fn test_rejects_class_ids_out_of_label_order() {
        let classifier = LinearSoftmaxClassifier {
            model_type: "LogisticRegression".into(),
            classes: vec![2, 1, 0],
            class_labels: vec!["Low".into(), "Medium".into(), "High".into()],
            coefficients: vec![vec![0.0; SCHEMA.len()]; 3],
            intercepts: vec![5.0, 0.0, 0.0],
        };
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));

        let err = PredictionService::new(
            Arc::new(classifier),
            storage,
            identity_vectorizer(),
            metadata(),
            DEFAULT_LOOKBACK_DAYS,
        )
        .err()
        .expect("Should reject");
        assert!(matches!(
            err,
            VitalRiskError::Classifier(ClassifierError::ClassOrder { .. })
        ));
    }

    #[test]
    fn test_huge_lookback_degrades_to_no_history() {
        let classifier = Arc::new(FixedClassifier::new(0, vec![0.7, 0.2, 0.1]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = PredictionService::new(
            Arc::clone(&classifier),
            storage,
            identity_vectorizer(),
            metadata(),
            u32::MAX,
        )
        .expect("Should build service");

        let result = service
            .predict(&Reading::new(), Some("64b7f0c2a1e4d3b2c1a09f8e"))
            .expect("Should predict");
        assert_eq!(result.risk_level, RiskLevel::Low);

        // No-history path: bmi_estimate present, rolling features zero.
        let seen = classifier.seen.lock().expect("lock");
        assert_eq!(seen[0][8], 25.0);
        assert_eq!(seen[0][13], 0.0);
    }

    #[test]
    fn test_rejects_wrong_class_order() {
        let mut classifier = FixedClassifier::new(0, vec![1.0, 0.0, 0.0]);
        classifier.labels = vec!["High".into(), "Low".into(), "Medium".into()];
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));

        let err = PredictionService::new(
            Arc::new(classifier),
            storage,
            identity_vectorizer(),
            metadata(),
            DEFAULT_LOOKBACK_DAYS,
        )
        .err()
        .expect("Should reject");
        assert!(matches!(
            err,
            VitalRiskError::Classifier(ClassifierError::ClassOrder { .. })
        ));
    }

    #[test]
    fn test_history_feeds_rolling_features() {
        let classifier = Arc::new(FixedClassifier::new(1, vec![0.2, 0.6, 0.2]));
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let user = "64b7f0c2a1e4d3b2c1a09f8e";
        for (hours, systolic) in [(10, 140), (20, 130)] {
            storage
                .insert_record(
                    user,
                    &HistoricalSnapshot::new(
                        Utc::now() - Duration::hours(hours),
                        json!({"bloodPressure": {"systolic": systolic}}),
                    ),
                )
                .expect("Should insert");
        }
        let service = service_with(Arc::clone(&classifier), storage);

        service
            .predict(&scenario_a(), Some(user))
            .expect("Should predict");

        let seen = classifier.seen.lock().expect("lock");
        let vector = &seen[0];
        assert_eq!(vector.len(), SCHEMA.len());
        // delta_sys_3d = 150 - mean(140, 130)
        assert_eq!(vector[9], 15.0);
        // bmi_estimate is not produced on the history path
        assert_eq!(vector[8], 0.0);
        // std_sys_7d over [140, 130]
        assert!((vector[13] - 50.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_repository_failure_degrades_to_no_history() {
        let classifier = Arc::new(FixedClassifier::new(0, vec![0.7, 0.2, 0.1]));
        let service = service_with(Arc::clone(&classifier), Arc::new(OfflineHistory));

        let result = service
            .predict(&Reading::new(), Some("64b7f0c2a1e4d3b2c1a09f8e"))
            .expect("Should still predict");
        assert_eq!(result.risk_level, RiskLevel::Low);

        let seen = classifier.seen.lock().expect("lock");
        // No-history path fills bmi_estimate with its default.
        assert_eq!(seen[0][8], 25.0);
    }

    #[test]
    fn test_health_reports_metadata() {
        let classifier = Arc::new(FixedClassifier::new(0, vec![1.0, 0.0, 0.0]));
        let service = service_with(classifier, Arc::new(OfflineHistory));

        let health = service.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.model_version, "1.0.0");
        assert_eq!(health.model_type, "LogisticRegression");
        assert_eq!(health.feature_count, 16);
    }

    #[test]
    fn test_from_bundled_artifacts() {
        let artifacts = crate::adapters::ArtifactLoader::new("models")
            .load()
            .expect("Bundled artifacts should load");
        let storage = Arc::new(SqliteHistory::in_memory().expect("Should create db"));
        let service = PredictionService::from_artifacts(artifacts, storage, DEFAULT_LOOKBACK_DAYS)
            .expect("Should build service");

        let high = service.predict(&scenario_a(), None).expect("Should predict");
        assert_eq!(high.risk_level, RiskLevel::High);
        assert!((high.probabilities.total() - 1.0).abs() < 1e-6);

        let low = service.predict(&Reading::new(), None).expect("Should predict");
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert!(low.risk_factors.is_empty());
    }
}
