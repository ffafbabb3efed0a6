//! Inference response returned to the serving host

use serde::{Deserialize, Serialize};

/// Probability that a scored record belongs to the fraud class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FraudScore {
    pub fraud_probability: f64,
}

impl FraudScore {
    pub fn new(fraud_probability: f64) -> Self {
        Self { fraud_probability }
    }
}
