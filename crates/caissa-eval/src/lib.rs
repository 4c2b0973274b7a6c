//! Wire contract between the engine and the external position evaluator.
//!
//! The evaluation service, typically a neural network, lives outside this
//! workspace. The engine's side of the contract is small: ship an
//! [`EncodedPosition`] (tensor planes plus the ids of the legal moves),
//! receive an [`Evaluation`] (a prior over the full move-id space plus a
//! scalar value). This crate defines those types, the [`Evaluator`] trait,
//! and a deterministic stub for tests and offline play.

use caissa_engine::encoding::{self, Planes, MOVE_SPACE};
use caissa_engine::GameState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised on either side of the evaluation contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The prior vector does not span the full move-id space.
    #[error("prior vector has length {0}, expected {MOVE_SPACE}")]
    PriorShape(usize),

    /// The value estimate is outside [-1, 1].
    #[error("value estimate {0} outside [-1, 1]")]
    ValueRange(f32),

    /// The service failed to produce an evaluation.
    #[error("evaluation service failure: {0}")]
    Service(String),
}

/// A position serialized for the evaluation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedPosition {
    /// The fixed-shape tensor described in [`caissa_engine::encoding`].
    pub planes: Planes,
    /// Ids of the legal moves in generation order; the service's prior
    /// vector is meaningful only at these indices.
    pub legal_move_ids: Vec<u16>,
}

impl EncodedPosition {
    /// Encodes the current position and its legal moves.
    pub fn from_state(state: &mut GameState) -> Self {
        let moves = state.legal_moves();
        EncodedPosition {
            planes: encoding::encode_planes(state),
            legal_move_ids: encoding::legal_move_ids(&moves),
        }
    }
}

/// The service's answer for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Prior probability per move id, `MOVE_SPACE` entries.
    pub priors: Vec<f32>,
    /// Scalar value estimate from the mover's perspective, in [-1, 1].
    pub value: f32,
}

impl Evaluation {
    /// Checks the shape and range invariants of the contract.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.priors.len() != MOVE_SPACE {
            return Err(EvalError::PriorShape(self.priors.len()));
        }
        if !(-1.0..=1.0).contains(&self.value) || self.value.is_nan() {
            return Err(EvalError::ValueRange(self.value));
        }
        Ok(())
    }

    /// Returns the prior for one move id.
    pub fn prior_for(&self, id: u16) -> f32 {
        self.priors.get(id as usize).copied().unwrap_or(0.0)
    }
}

/// A position evaluator.
///
/// Implementations are expected to return a validated [`Evaluation`]; use
/// [`Evaluation::validate`] before trusting a remote response.
pub trait Evaluator {
    fn evaluate(&mut self, position: &EncodedPosition) -> Result<Evaluation, EvalError>;
}

/// Spreads probability uniformly over the legal moves and calls every
/// position dead even. A stand-in for the real network in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn evaluate(&mut self, position: &EncodedPosition) -> Result<Evaluation, EvalError> {
        let mut priors = vec![0.0; MOVE_SPACE];
        if !position.legal_move_ids.is_empty() {
            let p = 1.0 / position.legal_move_ids.len() as f32;
            for &id in &position.legal_move_ids {
                priors[id as usize] = p;
            }
        }
        Ok(Evaluation { priors, value: 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_start_position() {
        let mut state = GameState::new();
        let encoded = EncodedPosition::from_state(&mut state);
        assert_eq!(encoded.legal_move_ids.len(), 20);
        assert_eq!(encoded.planes.len(), encoding::PLANE_COUNT);
    }

    #[test]
    fn uniform_priors_cover_exactly_the_legal_moves() {
        let mut state = GameState::new();
        let encoded = EncodedPosition::from_state(&mut state);
        let eval = UniformEvaluator.evaluate(&encoded).unwrap();
        eval.validate().unwrap();

        let total: f32 = eval.priors.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        for &id in &encoded.legal_move_ids {
            assert!((eval.prior_for(id) - 0.05).abs() < 1e-6);
        }
        let nonzero = eval.priors.iter().filter(|&&p| p != 0.0).count();
        assert_eq!(nonzero, 20);
    }

    #[test]
    fn validate_rejects_bad_shapes_and_values() {
        let short = Evaluation {
            priors: vec![0.0; 10],
            value: 0.0,
        };
        assert_eq!(short.validate(), Err(EvalError::PriorShape(10)));

        let out_of_range = Evaluation {
            priors: vec![0.0; MOVE_SPACE],
            value: 1.5,
        };
        assert_eq!(out_of_range.validate(), Err(EvalError::ValueRange(1.5)));

        let ok = Evaluation {
            priors: vec![0.0; MOVE_SPACE],
            value: -0.25,
        };
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn encoded_position_survives_json() {
        let mut state = GameState::new();
        state.make_move_uci("e2e4").unwrap();
        let encoded = EncodedPosition::from_state(&mut state);

        let json = serde_json::to_string(&encoded).unwrap();
        let decoded: EncodedPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, encoded);
    }

    #[test]
    fn evaluation_survives_json() {
        let mut state = GameState::new();
        let encoded = EncodedPosition::from_state(&mut state);
        let eval = UniformEvaluator.evaluate(&encoded).unwrap();

        let json = serde_json::to_string(&eval).unwrap();
        let decoded: Evaluation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, eval);
    }
}
