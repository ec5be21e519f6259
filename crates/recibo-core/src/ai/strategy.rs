//! Key/model failover rotation for the AI stage.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

/// A specific (API key, model) pair currently used for generation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub key_index: usize,
    pub model_index: usize,
    pub api_key: String,
    pub model: String,
}

/// Ordered (key, model) strategy state.
///
/// Constructed once at startup and shared by handle (`Arc`) with every
/// in-flight document. Rotation exhausts all models under the current key
/// before advancing the key: switching model is cheaper than switching
/// billing account. Once the last pair is reached the selector is
/// terminal and `rotate` always returns `false`.
#[derive(Debug)]
pub struct StrategySelector {
    api_keys: Vec<String>,
    models: Vec<String>,
    /// (key_index, model_index); indices always in bounds.
    state: Mutex<(usize, usize)>,
    /// Reentrancy guard: an overlapping rotate call is rejected outright
    /// instead of queueing, so two parallel failures cannot burn two
    /// strategies for one fault.
    rotating: AtomicBool,
}

impl StrategySelector {
    pub fn new(api_keys: Vec<String>, models: Vec<String>) -> Self {
        Self {
            api_keys,
            models,
            state: Mutex::new((0, 0)),
            rotating: AtomicBool::new(false),
        }
    }

    /// Whether at least one (key, model) pair exists.
    pub fn is_configured(&self) -> bool {
        !self.api_keys.is_empty() && !self.models.is_empty()
    }

    /// The currently selected strategy.
    pub fn current(&self) -> Strategy {
        let (key_index, model_index) = *self.state.lock().expect("strategy state lock poisoned");
        Strategy {
            key_index,
            model_index,
            api_key: self.api_keys[key_index].clone(),
            model: self.models[model_index].clone(),
        }
    }

    /// Advance to the next strategy.
    ///
    /// Returns `true` when a next strategy existed and was switched to.
    /// Returns `false` when exhausted (terminal state, state unchanged)
    /// or when another rotation is already in flight - the caller must
    /// treat that as final for this attempt.
    pub fn rotate(&self) -> bool {
        if self
            .rotating
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("rotation already in progress, rejecting concurrent attempt");
            return false;
        }

        let advanced = {
            let mut state = self.state.lock().expect("strategy state lock poisoned");
            let (key, model) = *state;
            if model + 1 < self.models.len() {
                *state = (key, model + 1);
                true
            } else if key + 1 < self.api_keys.len() {
                *state = (key + 1, 0);
                true
            } else {
                false
            }
        };

        self.rotating.store(false, Ordering::Release);

        if advanced {
            let (key, model) = *self.state.lock().expect("strategy state lock poisoned");
            debug!(key_index = key, model_index = model, "rotated AI strategy");
        } else {
            warn!("AI strategies exhausted, no rotation applied");
        }
        advanced
    }
}
