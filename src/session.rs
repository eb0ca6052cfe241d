//! Lifecycle of the single long-lived model handle.
//!
//! An [`InferenceSession`] moves through `Uninitialized → Loading → Ready`, or
//! `Loading → Failed` when the load errors. The transition into `Loading` is
//! taken under a mutex by exactly one caller; everyone else arriving while the
//! load is in flight waits on a condition variable and receives the same
//! outcome. A failed session stays failed until [`InferenceSession::reset`].

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Condvar, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    encoder::InputTensor,
    providers::{Model, ModelLoader},
};

/// Shared, type-erased load failure.
pub type LoadFailure = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by [`InferenceSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has not been initialised and on-demand loading is off.
    #[error("model is not loaded yet")]
    NotReady,
    /// The model failed to load; the session must be reset before retrying.
    #[error("model failed to load: {0}")]
    Failed(#[source] LoadFailure),
    /// A thread panicked while holding the session lock.
    #[error("session lock was poisoned by a previous panic")]
    Poisoned,
    /// The runtime failed while evaluating the model.
    #[error("inference failed: {0}")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// When the model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Startup calls [`InferenceSession::init`]; inference before that fails
    /// fast with [`SessionError::NotReady`].
    #[default]
    Eager,
    /// The first inference call loads the model while others wait.
    OnDemand,
}

/// Returned when parsing an unknown [`InitPolicy`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown init policy {0:?}; expected `eager` or `on_demand`")]
pub struct ParseInitPolicyError(String);

impl FromStr for InitPolicy {
    type Err = ParseInitPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "eager" => Ok(Self::Eager),
            "on_demand" | "on-demand" => Ok(Self::OnDemand),
            other => Err(ParseInitPolicyError(other.to_owned())),
        }
    }
}

impl fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eager => "eager",
            Self::OnDemand => "on_demand",
        })
    }
}

enum Slot<M> {
    Uninitialized,
    Loading,
    Ready(Arc<M>),
    Failed(LoadFailure),
}

impl<M> Slot<M> {
    const fn state(&self) -> SessionState {
        match self {
            Self::Uninitialized => SessionState::Uninitialized,
            Self::Loading => SessionState::Loading,
            Self::Ready(_) => SessionState::Ready,
            Self::Failed(_) => SessionState::Failed,
        }
    }
}

#[derive(Debug, Error)]
#[error("model loader panicked")]
struct LoaderPanicked;

/// Owns the loaded model and guards its at-most-once initialisation.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
/// use doodle_classifier::encoder::{BITMAP_LEN, InputTensor, encode};
/// use doodle_classifier::providers::{Model, ModelLoader};
/// use doodle_classifier::session::{InferenceSession, InitPolicy, SessionState};
///
/// struct Constant;
/// impl Model for Constant {
///     type Error = Infallible;
///     fn run(&self, _: &InputTensor) -> Result<Vec<f32>, Infallible> {
///         Ok(vec![1.0, 0.0])
///     }
/// }
///
/// struct Loader;
/// impl ModelLoader for Loader {
///     type Model = Constant;
///     type Error = Infallible;
///     fn load(&self) -> Result<Constant, Infallible> {
///         Ok(Constant)
///     }
/// }
///
/// let session = InferenceSession::new(Loader, InitPolicy::OnDemand);
/// assert_eq!(session.state(), SessionState::Uninitialized);
/// let tensor = encode(&"0".repeat(BITMAP_LEN)).unwrap();
/// assert_eq!(session.run(&tensor).unwrap(), vec![1.0, 0.0]);
/// assert_eq!(session.state(), SessionState::Ready);
/// ```
pub struct InferenceSession<L: ModelLoader> {
    loader: L,
    policy: InitPolicy,
    slot: Mutex<Slot<L::Model>>,
    settled: Condvar,
}

impl<L: ModelLoader> InferenceSession<L> {
    /// Create an uninitialised session.
    #[must_use]
    pub fn new(loader: L, policy: InitPolicy) -> Self {
        Self {
            loader,
            policy,
            slot: Mutex::new(Slot::Uninitialized),
            settled: Condvar::new(),
        }
    }

    /// Initialisation policy in effect.
    #[must_use]
    pub const fn policy(&self) -> InitPolicy {
        self.policy
    }

    /// Current lifecycle state. A poisoned lock reads as `Failed`.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.slot
            .lock()
            .map_or(SessionState::Failed, |slot| slot.state())
    }

    /// Load the model if no load has happened yet, then return it.
    ///
    /// Concurrent callers share one load. Calling this on a `Ready` session is
    /// cheap.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Failed`] when this or an earlier load failed.
    pub fn init(&self) -> Result<Arc<L::Model>, SessionError> {
        self.acquire(true)
    }

    /// Run inference, loading on demand when the policy allows it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotReady`] for an uninitialised eager session,
    /// [`SessionError::Failed`] after a failed load and
    /// [`SessionError::Inference`] when the runtime errors.
    pub fn run(&self, input: &InputTensor) -> Result<Vec<f32>, SessionError> {
        let model = self.acquire(self.policy == InitPolicy::OnDemand)?;
        model
            .run(input)
            .map_err(|source| SessionError::Inference(Box::new(source)))
    }

    /// Return a `Failed` session to `Uninitialized` so it can be loaded again.
    ///
    /// Returns whether a reset took place; other states are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Poisoned`] if the lock is poisoned.
    pub fn reset(&self) -> Result<bool, SessionError> {
        let mut slot = self.lock()?;
        if matches!(*slot, Slot::Failed(_)) {
            *slot = Slot::Uninitialized;
            info!("inference session reset");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot<L::Model>>, SessionError> {
        self.slot.lock().map_err(|_| SessionError::Poisoned)
    }

    fn acquire(&self, allow_load: bool) -> Result<Arc<L::Model>, SessionError> {
        let mut slot = self.lock()?;
        if matches!(*slot, Slot::Loading) {
            debug!("waiting for model load in progress");
            slot = self
                .settled
                .wait_while(slot, |slot| matches!(slot, Slot::Loading))
                .map_err(|_| SessionError::Poisoned)?;
        }
        match &*slot {
            Slot::Ready(model) => return Ok(Arc::clone(model)),
            Slot::Failed(source) => return Err(SessionError::Failed(Arc::clone(source))),
            Slot::Uninitialized if !allow_load => return Err(SessionError::NotReady),
            Slot::Uninitialized | Slot::Loading => {}
        }
        *slot = Slot::Loading;
        drop(slot);

        let guard = LoadGuard {
            session: self,
            settled: false,
        };
        info!("loading model");
        let outcome = self.loader.load();
        guard.settle(outcome)
    }
}

impl<L: ModelLoader> fmt::Debug for InferenceSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceSession")
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Publishes the load outcome and wakes waiters, even if the loader panics.
struct LoadGuard<'a, L: ModelLoader> {
    session: &'a InferenceSession<L>,
    settled: bool,
}

impl<L: ModelLoader> LoadGuard<'_, L> {
    fn settle(
        mut self,
        outcome: Result<L::Model, L::Error>,
    ) -> Result<Arc<L::Model>, SessionError> {
        let next = match outcome {
            Ok(model) => {
                info!("model ready");
                Ok(Arc::new(model))
            }
            Err(source) => {
                warn!(error = %source, "model load failed");
                Err(Arc::new(source) as LoadFailure)
            }
        };
        let mut slot = self.session.lock()?;
        *slot = match &next {
            Ok(model) => Slot::Ready(Arc::clone(model)),
            Err(source) => Slot::Failed(Arc::clone(source)),
        };
        self.settled = true;
        drop(slot);
        self.session.settled.notify_all();
        next.map_err(SessionError::Failed)
    }
}

impl<L: ModelLoader> Drop for LoadGuard<'_, L> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Unwinding out of the loader: do not leave waiters blocked on Loading.
        if let Ok(mut slot) = self.session.slot.lock() {
            *slot = Slot::Failed(Arc::new(LoaderPanicked));
        }
        self.session.settled.notify_all();
    }
}
