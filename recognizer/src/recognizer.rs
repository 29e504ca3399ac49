use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::RecognizerConfig;
use crate::errors::{RecognizeError, RecognizeResult};
use crate::inference::InferenceEngine;
use crate::labels::{ClassificationResult, LabelTable};
use crate::normalize::ImageNormalizer;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecognizerState {
    /// Neither model nor labels.
    Uninitialized,
    /// One of them.
    Loaded,
    Ready,
}

/// Image classification service.
///
/// Built explicitly, loaded once, then shared (by reference or through an `Arc`) with every
/// request handler. Model and labels are never mutated while requests run, so `recognize`
/// only needs `&self`.
#[derive(Debug)]
pub struct Recognizer {
    config: RecognizerConfig,
    normalizer: ImageNormalizer,
    engine: Option<InferenceEngine>,
    labels: Option<LabelTable>,
    workers: Arc<AtomicUsize>,
}

/// One running deadline worker. Released when the worker thread ends.
#[derive(Debug)]
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Recognizer {
    pub fn new(config: RecognizerConfig) -> RecognizeResult<Recognizer> {
        config.validate()?;
        let normalizer = ImageNormalizer::new(config.normalization.clone())?;
        Ok(Recognizer {
            config,
            normalizer,
            engine: None,
            labels: None,
            workers: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Shortcut for `new`, `load_model`, `load_labels`.
    pub fn ready(
        config: RecognizerConfig,
        frozen: &[u8],
        labels: LabelTable,
    ) -> RecognizeResult<Recognizer> {
        let mut recognizer = Recognizer::new(config)?;
        recognizer.load_model(frozen)?;
        recognizer.load_labels(labels)?;
        Ok(recognizer)
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn state(&self) -> RecognizerState {
        match (&self.engine, &self.labels) {
            (Some(_), Some(_)) => RecognizerState::Ready,
            (None, None) => RecognizerState::Uninitialized,
            _ => RecognizerState::Loaded,
        }
    }

    pub fn load_model(&mut self, frozen: &[u8]) -> RecognizeResult<()> {
        self.engine = Some(InferenceEngine::load(frozen, &self.config)?);
        self.check_class_count();
        Ok(())
    }

    pub fn load_labels(&mut self, labels: LabelTable) -> RecognizeResult<()> {
        if labels.is_empty() {
            return Err(RecognizeError::configuration("label table is empty"));
        }
        info!("loaded {} labels", labels.len());
        self.labels = Some(labels);
        self.check_class_count();
        Ok(())
    }

    /// Drops model and labels, back to `Uninitialized`.
    pub fn unload(&mut self) {
        self.engine = None;
        self.labels = None;
    }

    fn check_class_count(&self) {
        if let (Some(engine), Some(labels)) = (&self.engine, &self.labels) {
            if let Some(classes) = engine.class_count() {
                if classes > labels.len() {
                    warn!(
                        "model has {} classes but only {} labels, the last ones can not be resolved",
                        classes,
                        labels.len()
                    );
                }
            }
        }
    }

    pub fn recognize(&self, image: &[u8]) -> RecognizeResult<ClassificationResult> {
        let (Some(engine), Some(labels)) = (&self.engine, &self.labels) else {
            return Err(RecognizeError::NotLoaded);
        };
        let normalized = self.normalizer.normalize(image)?;
        let probabilities = engine.infer(normalized)?;
        let result = labels.resolve(&probabilities)?;
        debug!("best match: {}", result);
        Ok(result)
    }

    /// Like `recognize`, but gives up after `deadline`.
    ///
    /// The work happens on a dedicated thread. On timeout the caller gets `DeadlineExceeded`
    /// immediately while the thread runs to completion and releases its resources. At most
    /// `max_workers` such threads exist at any time, further calls fail with `Overloaded`.
    pub fn recognize_with_deadline(
        self: &Arc<Self>,
        image: Vec<u8>,
        deadline: Duration,
    ) -> RecognizeResult<ClassificationResult> {
        if self.state() != RecognizerState::Ready {
            return Err(RecognizeError::NotLoaded);
        }
        let slot = self.acquire_worker()?;
        let (tx, rx) = mpsc::sync_channel(1);
        let worker = Arc::clone(self);
        thread::Builder::new()
            .name("imagerec-worker".to_string())
            .spawn(move || {
                let result = worker.recognize(&image);
                drop(slot);
                let _ = tx.send(result);
            })
            .map_err(|e| RecognizeError::Execution(e.into()))?;
        match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("recognition exceeded {:?}", deadline);
                Err(RecognizeError::DeadlineExceeded(deadline))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(RecognizeError::Execution(anyhow::anyhow!("recognition worker panicked")))
            }
        }
    }

    fn acquire_worker(&self) -> RecognizeResult<WorkerSlot> {
        let max = self.config.max_workers;
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map_err(|_| {
                warn!("refusing recognition, {} workers still running", max);
                RecognizeError::Overloaded(max)
            })?;
        Ok(WorkerSlot(Arc::clone(&self.workers)))
    }

    /// Uses the configured deadline when there is one.
    pub fn recognize_bounded(
        self: &Arc<Self>,
        image: Vec<u8>,
    ) -> RecognizeResult<ClassificationResult> {
        match self.config.deadline() {
            Some(deadline) => self.recognize_with_deadline(image, deadline),
            None => self.recognize(&image),
        }
    }
}
