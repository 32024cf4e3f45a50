//! Agent parameters and the per-decision feature set

use std::path::Path;

use anyhow::Context;
use fourrow_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of free parameters in the model
pub const N_PARAMS: usize = 10;

/// Parameter names in load order
pub const PARAM_NAMES: [&str; N_PARAMS] = [
    "lmbda", "gamma", "theta", "delta", "c", "w_ce", "w_c2", "w_u2", "w_c3", "w_c4",
];

// ============================================================================
// AGENT PARAMETERS
// ============================================================================

/// The ten values that shape one agent's behavior
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Lapse probability: play a uniformly random move instead of searching
    pub lmbda: f64,
    /// Per-iteration stop probability
    pub gamma: f64,
    /// Pruning tolerance around the best child value
    pub theta: f64,
    /// Per-feature dropout probability
    pub delta: f64,
    /// Discount on the side not about to move
    pub c: f64,
    /// Center proximity weight
    pub w_ce: f64,
    /// Connected-2 weight
    pub w_c2: f64,
    /// Unconnected-2 weight
    pub w_u2: f64,
    /// Connected-3 weight
    pub w_c3: f64,
    /// Connected-4 weight
    pub w_c4: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            lmbda: 0.02,
            gamma: 0.02,
            theta: 2.0,
            delta: 0.005,
            c: 0.92498,
            w_ce: 0.60913,
            w_c2: 0.90444,
            w_u2: 0.45076,
            w_c3: 3.42720,
            w_c4: 20.17280,
        }
    }
}

/// On-disk layout: named fields or a bare ordered list
#[derive(Deserialize)]
#[serde(untagged)]
enum ParamsFile {
    Named(AgentParams),
    Ordered(Vec<f64>),
}

impl AgentParams {
    /// Build from an ordered list (lmbda, gamma, theta, delta, c, w_ce, w_c2, w_u2, w_c3, w_c4)
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != N_PARAMS {
            return Err(Error::ParamCount {
                expected: N_PARAMS,
                got: values.len(),
            });
        }
        Ok(Self {
            lmbda: values[0],
            gamma: values[1],
            theta: values[2],
            delta: values[3],
            c: values[4],
            w_ce: values[5],
            w_c2: values[6],
            w_u2: values[7],
            w_c3: values[8],
            w_c4: values[9],
        })
    }

    /// Inverse of [`AgentParams::from_slice`]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.lmbda, self.gamma, self.theta, self.delta, self.c,
            self.w_ce, self.w_c2, self.w_u2, self.w_c3, self.w_c4,
        ]
    }

    /// Weight attached to a droppable feature
    pub fn weight(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Connected2 => self.w_c2,
            Feature::Unconnected2 => self.w_u2,
            Feature::Connected3 => self.w_c3,
            Feature::Connected4 => self.w_c4,
        }
    }

    /// Load from a JSON file (object with named fields, or an array of 10 numbers)
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameter file: {}", path.display()))?;

        match serde_json::from_str::<ParamsFile>(&content)
            .with_context(|| format!("Failed to parse parameter file: {}", path.display()))?
        {
            ParamsFile::Named(params) => Ok(params),
            ParamsFile::Ordered(values) => Ok(Self::from_slice(&values)?),
        }
    }

    /// Save as pretty JSON with named fields
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write parameter file: {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// FEATURES
// ============================================================================

/// Pattern features that can be dropped for a decision.
///
/// Center proximity is always evaluated and is not part of this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Connected2 = 0,
    Unconnected2 = 1,
    Connected3 = 2,
    Connected4 = 3,
}

impl Feature {
    /// Fixed evaluation and dropout-sampling order
    pub const ALL: [Feature; 4] = [
        Feature::Connected2,
        Feature::Unconnected2,
        Feature::Connected3,
        Feature::Connected4,
    ];

    /// Pieces needed before the pattern can occur
    pub fn min_pieces(self) -> usize {
        match self {
            Feature::Connected2 | Feature::Unconnected2 => 2,
            Feature::Connected3 => 3,
            Feature::Connected4 => 4,
        }
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Active subset of [`Feature`], stored as a bit set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(u8);

impl FeatureSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b1111)
    }

    pub fn contains(self, feature: Feature) -> bool {
        self.0 & feature.bit() != 0
    }

    pub fn insert(&mut self, feature: Feature) {
        self.0 |= feature.bit();
    }

    pub fn remove(&mut self, feature: Feature) {
        self.0 &= !feature.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Active features in evaluation order
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |&f| self.contains(f))
    }

    /// Resample with independent dropout: one uniform draw per feature, in
    /// [`Feature::ALL`] order, keeping the feature when the draw exceeds `delta`.
    pub fn sample<R: Rng>(rng: &mut R, delta: f64) -> Self {
        let mut set = Self::empty();
        for feature in Feature::ALL {
            if rng.gen::<f64>() > delta {
                set.insert(feature);
            }
        }
        set
    }
}
