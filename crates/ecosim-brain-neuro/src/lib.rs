//! NeuroFlow-backed policy models.
//!
//! A [`NeuroflowPolicy`] wraps the `neuroflow` crate's [`FeedForward`] network as an
//! [`InferenceModel`], so one set of weights can steer every creature of a species through
//! [`SharedPolicy`]. Weights are stored as JSON alongside the architecture that produced them.

use ecosim_brain::{ACTION_SIZE, InferenceModel, SharedPolicy, UnloadedModel, observation_size};
use ecosim_core::{Species, WorldState};
use neuroflow::FeedForward;
use neuroflow::activators::Type;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

/// Activation families supported by NeuroFlow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NeuroflowActivation {
    /// Hyperbolic tangent activation.
    #[default]
    Tanh,
    /// Logistic sigmoid activation.
    Sigmoid,
    /// Rectified linear unit (ReLU).
    Relu,
}

impl NeuroflowActivation {
    fn to_type(self) -> Type {
        match self {
            Self::Tanh => Type::Tanh,
            Self::Sigmoid => Type::Sigmoid,
            Self::Relu => Type::Relu,
        }
    }
}

/// Architecture and trainer settings of a policy network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NeuroflowPolicyConfig {
    /// Sizes of hidden layers between the observation and action layers.
    pub hidden_layers: Vec<usize>,
    pub activation: NeuroflowActivation,
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for NeuroflowPolicyConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![48, 32, 24],
            activation: NeuroflowActivation::Tanh,
            learning_rate: 0.01,
            momentum: 0.05,
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to access policy weights")]
    Io(#[from] std::io::Error),
    #[error("malformed policy weights")]
    Json(#[from] serde_json::Error),
    #[error("{species} policies take {expected} inputs, weights expect {found}")]
    ObservationSize {
        species: Species,
        expected: usize,
        found: usize,
    },
    #[error("network layers do not match {inputs} inputs and the action width")]
    Shape { inputs: usize },
}

#[derive(Serialize)]
struct LayerSeed {
    v: Vec<f64>,
    y: Vec<f64>,
    delta: Vec<f64>,
    prev_delta: Vec<f64>,
    w: Vec<Vec<f64>>,
}

#[derive(Serialize)]
struct FeedForwardSeed {
    layers: Vec<LayerSeed>,
    learn_rate: f64,
    momentum: f64,
    error: f64,
    act_type: Type,
}

#[derive(Serialize)]
struct PolicyFileRef<'a> {
    observation_size: usize,
    config: &'a NeuroflowPolicyConfig,
    network: &'a FeedForward,
}

#[derive(Deserialize)]
struct PolicyFile {
    observation_size: usize,
    config: NeuroflowPolicyConfig,
    network: FeedForward,
}

/// Feed-forward policy shared read-only between creatures.
///
/// `FeedForward::calc` needs `&mut self` for its scratch buffers, so the network sits behind a
/// mutex; inference never changes the weights.
pub struct NeuroflowPolicy {
    network: Mutex<FeedForward>,
    config: NeuroflowPolicyConfig,
    observation_size: usize,
}

impl std::fmt::Debug for NeuroflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuroflowPolicy")
            .field("config", &self.config)
            .field("observation_size", &self.observation_size)
            .finish_non_exhaustive()
    }
}

impl NeuroflowPolicy {
    pub const KIND: &'static str = "neuroflow";

    /// Fresh network with uniform random weights in `[-1, 1)`.
    pub fn random(
        config: NeuroflowPolicyConfig,
        observation_size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Self, PolicyLoadError> {
        let mut widths = Vec::with_capacity(config.hidden_layers.len() + 2);
        widths.push(observation_size);
        widths.extend(config.hidden_layers.iter().copied());
        widths.push(ACTION_SIZE);

        let mut layers = Vec::with_capacity(widths.len() - 1);
        for pair in widths.windows(2) {
            let (inputs, outputs) = (pair[0], pair[1]);
            let w: Vec<Vec<f64>> = (0..outputs)
                .map(|_| (0..=inputs).map(|_| rng.random_range(-1.0..1.0)).collect())
                .collect();
            layers.push(LayerSeed {
                v: vec![0.0; outputs],
                y: vec![0.0; outputs],
                delta: vec![0.0; outputs],
                prev_delta: vec![0.0; outputs],
                w,
            });
        }

        let seed = FeedForwardSeed {
            layers,
            learn_rate: config.learning_rate,
            momentum: config.momentum,
            error: 0.0,
            act_type: config.activation.to_type(),
        };
        let network: FeedForward = serde_json::from_value(serde_json::to_value(&seed)?)?;
        Ok(Self::assemble(network, config, observation_size))
    }

    fn assemble(
        mut network: FeedForward,
        config: NeuroflowPolicyConfig,
        observation_size: usize,
    ) -> Self {
        network
            .activation(config.activation.to_type())
            .learning_rate(config.learning_rate)
            .momentum(config.momentum);
        Self {
            network: Mutex::new(network),
            config,
            observation_size,
        }
    }

    /// Input and output widths read back from the serialized layers.
    fn shape(network: &FeedForward) -> Option<(usize, usize)> {
        let value = serde_json::to_value(network).ok()?;
        let layers = value.get("layers")?.as_array()?;
        let first = layers.first()?.get("w")?.as_array()?;
        let inputs = first.first()?.as_array()?.len().checked_sub(1)?;
        let outputs = layers.last()?.get("w")?.as_array()?.len();
        Some((inputs, outputs))
    }

    /// Load weights written by [`NeuroflowPolicy::save_json`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let file: PolicyFile = serde_json::from_reader(reader)?;
        match Self::shape(&file.network) {
            Some((inputs, ACTION_SIZE)) if inputs == file.observation_size => {}
            _ => {
                return Err(PolicyLoadError::Shape {
                    inputs: file.observation_size,
                });
            }
        }
        Ok(Self::assemble(file.network, file.config, file.observation_size))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PolicyLoadError> {
        let network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(
            writer,
            &PolicyFileRef {
                observation_size: self.observation_size,
                config: &self.config,
                network: &network,
            },
        )?;
        Ok(())
    }

    /// Load a `species` policy, checking it was trained on that species' observations.
    pub fn load_for(path: impl AsRef<Path>, species: Species) -> Result<Self, PolicyLoadError> {
        let policy = Self::from_json_file(path)?;
        let expected = observation_size(species);
        if policy.observation_size != expected {
            return Err(PolicyLoadError::ObservationSize {
                species,
                expected,
                found: policy.observation_size,
            });
        }
        Ok(policy)
    }

    /// Load a policy or fall back to a model that leaves creatures idle.
    #[must_use]
    pub fn load_or_unloaded(path: impl AsRef<Path>, species: Species) -> Arc<dyn InferenceModel> {
        let path = path.as_ref();
        match Self::load_for(path, species) {
            Ok(policy) => {
                info!(%species, path = %path.display(), "loaded neuroflow policy");
                Arc::new(policy) as Arc<dyn InferenceModel>
            }
            Err(error) => {
                warn!(%species, path = %path.display(), %error, "falling back to an idle policy");
                Arc::new(UnloadedModel::new(observation_size(species)))
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> &NeuroflowPolicyConfig {
        &self.config
    }
}

impl InferenceModel for NeuroflowPolicy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn infer(&self, observation: &[f32]) -> Option<[f32; ACTION_SIZE]> {
        if observation.len() != self.observation_size {
            return None;
        }
        let inputs: Vec<f64> = observation.iter().map(|value| f64::from(*value)).collect();
        let mut network = self.network.lock().ok()?;
        let outputs = network.calc(&inputs);
        if outputs.len() < ACTION_SIZE {
            return None;
        }
        let mut action = [0.0; ACTION_SIZE];
        for (dst, src) in action.iter_mut().zip(outputs) {
            *dst = *src as f32;
        }
        Some(action)
    }
}

/// Register `model` as the shared policy for `species` and return its registry key.
pub fn register_policy(
    world: &mut WorldState,
    species: Species,
    model: Arc<dyn InferenceModel>,
) -> u64 {
    SharedPolicy::new(model, species).register(world.brain_registry_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn small() -> NeuroflowPolicyConfig {
        NeuroflowPolicyConfig {
            hidden_layers: vec![8],
            ..NeuroflowPolicyConfig::default()
        }
    }

    #[test]
    fn random_policy_outputs_bounded_actions() {
        let mut rng = SmallRng::seed_from_u64(0xDEADBEEF);
        let policy = NeuroflowPolicy::random(small(), 61, &mut rng).expect("policy");
        let action = policy.infer(&[0.25; 61]).expect("action");
        assert!(action.iter().all(|value| (-1.0..=1.0).contains(value)));
        assert!(policy.infer(&[0.0; 10]).is_none());
        assert_eq!(NeuroflowPolicy::shape(&policy.network.lock().expect("lock")), Some((61, 3)));
    }

    #[test]
    fn identical_seeds_build_identical_networks() {
        let build = || {
            let mut rng = SmallRng::seed_from_u64(42);
            NeuroflowPolicy::random(small(), 20, &mut rng).expect("policy")
        };
        let observation: Vec<f32> = (0..20).map(|i| i as f32 / 20.0).collect();
        assert_eq!(build().infer(&observation), build().infer(&observation));
    }

    #[test]
    fn missing_weights_degrade_to_unloaded() {
        let model = NeuroflowPolicy::load_or_unloaded("/nonexistent/ecosim.json", Species::Smart);
        assert!(!model.is_loaded());
        assert_eq!(model.observation_size(), 110);
    }
}
