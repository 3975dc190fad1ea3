use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{Error, Result};

/// Training driver states
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum State {
    /// Nothing has happened yet
    Idle,

    /// Model, tokenizer and datasets are being obtained
    Loading,

    /// Running training batches for an epoch
    TrainingEpoch(usize),

    /// Running the evaluation pass for an epoch
    Evaluating(usize),

    /// Stopped between batches of an epoch; a checkpoint follows
    Interrupted(usize),

    /// Every epoch has been trained and evaluated
    Done,
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Loading => write!(f, "Loading"),
            State::TrainingEpoch(epoch) => write!(f, "TrainingEpoch({})", epoch),
            State::Evaluating(epoch) => write!(f, "Evaluating({})", epoch),
            State::Interrupted(epoch) => write!(f, "Interrupted({})", epoch),
            State::Done => write!(f, "Done"),
        }
    }
}

/// Tracks the driver's state and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct StateMachine {
    epochs: usize,
    history: Vec<State>,
}

impl StateMachine {
    /// A machine in `Idle` for a run of `epochs` epochs
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            history: vec![State::Idle],
        }
    }

    /// The current state
    pub fn state(&self) -> State {
        self.history.last().copied().unwrap_or(State::Idle)
    }

    /// Every state visited so far, starting with `Idle`
    pub fn history(&self) -> &[State] {
        &self.history
    }

    /// Move to `next` if the transition is legal.
    ///
    /// `Loading` may enter any epoch below the epoch count so that resumed runs can start late.
    pub fn transition(&mut self, next: State) -> Result<()> {
        let current = self.state();

        let legal = match (current, next) {
            (State::Idle, State::Loading) => true,
            (State::Loading, State::TrainingEpoch(epoch)) => epoch < self.epochs,
            (State::TrainingEpoch(i), State::Evaluating(j)) => i == j,
            (State::TrainingEpoch(i), State::Interrupted(j)) => i == j,
            (State::Evaluating(i), State::TrainingEpoch(j)) => j == i + 1 && j < self.epochs,
            (State::Evaluating(i), State::Done) => i + 1 == self.epochs,
            _ => false,
        };

        if !legal {
            return Err(Error::InvalidTransition {
                from: current,
                to: next,
            });
        }

        log::debug!("{} -> {}", current, next);
        self.history.push(next);

        Ok(())
    }
}

/// A flag polled by the driver between batches. Setting it stops the run at the next batch
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A signal that has not been raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has been raised
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
