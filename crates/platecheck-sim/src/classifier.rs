//! Statistical well classifier
//!
//! The trait is the seam: the built-in `ThresholdClassifier` is a logistic
//! score over the two synthetic features, standing in for a trained model.
//! Swapping in a real model only means implementing `WellClassifier`.

use serde::{Deserialize, Serialize};

/// Classifier output label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    /// No growth detected
    Clean,
    /// Contamination detected
    Contaminated,
}

/// One classifier opinion about a well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    /// Predicted label
    pub label: ClassLabel,
    /// Confidence in the predicted label, in [0, 1]
    pub confidence: f32,
}

/// Synthetic optical reading for one well at one timepoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellMeasurement {
    /// Well position (A1, A2, A3)
    pub well_id: String,
    /// Optical-density-style turbidity, roughly 0..1
    pub turbidity: f32,
    /// Local texture variance of the well image, roughly 0..1
    pub texture_variance: f32,
}

/// Statistical classifier over well measurements.
pub trait WellClassifier: Send + Sync {
    /// Classify a single measurement.
    fn classify(&self, measurement: &WellMeasurement) -> ClassifierVerdict;
}

/// Logistic threshold classifier over turbidity and texture variance.
#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    turbidity_weight: f32,
    texture_weight: f32,
    bias: f32,
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        // Weights chosen so the synthetic clean/contaminated regimes sit
        // clearly on either side of 0.5.
        Self {
            turbidity_weight: 8.0,
            texture_weight: 6.0,
            bias: -5.0,
        }
    }
}

impl ThresholdClassifier {
    /// Classifier with custom decision-boundary weights.
    #[must_use]
    pub fn new(turbidity_weight: f32, texture_weight: f32, bias: f32) -> Self {
        Self {
            turbidity_weight,
            texture_weight,
            bias,
        }
    }

    fn score(&self, measurement: &WellMeasurement) -> f32 {
        let linear = self.turbidity_weight * measurement.turbidity
            + self.texture_weight * measurement.texture_variance
            + self.bias;
        1.0 / (1.0 + (-linear).exp())
    }
}

impl WellClassifier for ThresholdClassifier {
    fn classify(&self, measurement: &WellMeasurement) -> ClassifierVerdict {
        let score = self.score(measurement);
        if score >= 0.5 {
            ClassifierVerdict {
                label: ClassLabel::Contaminated,
                confidence: score,
            }
        } else {
            ClassifierVerdict {
                label: ClassLabel::Clean,
                confidence: 1.0 - score,
            }
        }
    }
}
