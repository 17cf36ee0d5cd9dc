//! Thresholded fraud decision

/// Probability above which a transaction is labelled fraudulent
pub const DEFAULT_THRESHOLD: f64 = 0.875;

/// Turns fraud probabilities into binary labels.
///
/// The threshold is a deployment constant; changing it needs no retraining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringDecision {
    threshold: f64,
}

impl ScoringDecision {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// 1 if the probability is strictly greater than the threshold, else 0
    pub fn decide(&self, probability: f64) -> u8 {
        u8::from(probability > self.threshold)
    }

    pub fn decide_all(&self, probabilities: &[f64]) -> Vec<u8> {
        probabilities.iter().map(|p| self.decide(*p)).collect()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for ScoringDecision {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let decision = ScoringDecision::default();

        assert_eq!(decision.decide(0.875), 0);
        assert_eq!(decision.decide(0.8751), 1);
        assert_eq!(decision.decide(0.0), 0);
        assert_eq!(decision.decide(1.0), 1);
    }

    #[test]
    fn test_custom_threshold() {
        let decision = ScoringDecision::new(0.5);
        assert_eq!(decision.decide_all(&[0.2, 0.5, 0.51, 0.9]), vec![0, 0, 1, 1]);
    }
}
