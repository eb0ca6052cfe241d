#![allow(dead_code, reason = "each test crate uses a subset of the helpers")]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use doodle_classifier::{
    InputTensor, Model, ModelLoader,
    encoder::{BITMAP_LEN, BITMAP_WIDTH},
};
use thiserror::Error;

#[expect(clippy::float_arithmetic, reason = "tolerance comparison")]
#[must_use]
pub fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

/// Blank canvas.
pub fn blank_bitmap() -> String {
    "0".repeat(BITMAP_LEN)
}

/// Canvas with a horizontal stroke across row `row`.
pub fn stroke_bitmap(row: usize) -> String {
    let mut bitmap = blank_bitmap();
    let start = row * BITMAP_WIDTH;
    bitmap.replace_range(start..start + BITMAP_WIDTH, &"1".repeat(BITMAP_WIDTH));
    bitmap
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("fake weights unavailable")]
pub struct FakeLoadError;

#[derive(Debug, Error)]
#[error("fake runtime fault")]
pub struct FakeRunError;

/// Model whose scores shift with the amount of ink so outputs depend on input.
#[derive(Debug, Clone)]
pub struct FakeModel {
    base: Vec<f32>,
    fail: bool,
}

impl Model for FakeModel {
    type Error = FakeRunError;

    #[expect(clippy::float_arithmetic, reason = "synthetic logits")]
    #[expect(clippy::cast_precision_loss, reason = "small counts")]
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, FakeRunError> {
        if self.fail {
            return Err(FakeRunError);
        }
        let ink = input.ink_count() as f32 / BITMAP_LEN as f32;
        Ok(self
            .base
            .iter()
            .enumerate()
            .map(|(index, score)| score + ink * index as f32)
            .collect())
    }
}

/// Loader that counts loads and can be slowed down or made to fail.
#[derive(Debug, Clone)]
pub struct FakeLoader {
    loads: Arc<AtomicUsize>,
    base: Vec<f32>,
    delay: Duration,
    fail_load: bool,
    fail_run: bool,
}

impl FakeLoader {
    pub fn new(base: Vec<f32>) -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            base,
            delay: Duration::ZERO,
            fail_load: false,
            fail_run: false,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    #[must_use]
    pub fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    /// Shared load counter; stays valid after the loader moves into a session.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl ModelLoader for FakeLoader {
    type Model = FakeModel;
    type Error = FakeLoadError;

    fn load(&self) -> Result<FakeModel, FakeLoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail_load {
            Err(FakeLoadError)
        } else {
            Ok(FakeModel {
                base: self.base.clone(),
                fail: self.fail_run,
            })
        }
    }
}
