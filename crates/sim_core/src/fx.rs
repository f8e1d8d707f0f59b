//! Best-effort visual-effect hand-off for scheduled transfers.
//!
//! Sinks may fail; the scheduler logs and moves on.

use std::collections::VecDeque;

use crate::{Endpoint, TransferId};

/// Most recent effects kept by [`RecordingFxSink`].
pub const MAX_RECORDED_FX: usize = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct TransferFx {
    pub transfer_id: TransferId,
    pub amount: f64,
    pub from: Endpoint,
    pub to: Endpoint,
    /// Seconds until arrival.
    pub duration: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("fx sink unavailable: {0}")]
    Unavailable(String),
}

pub trait TransferFxSink {
    fn push(&mut self, fx: TransferFx) -> Result<(), FxError>;
}

/// Drops every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFxSink;

impl TransferFxSink for NullFxSink {
    fn push(&mut self, _fx: TransferFx) -> Result<(), FxError> {
        Ok(())
    }
}

/// Keeps the last [`MAX_RECORDED_FX`] effects, oldest first.
#[derive(Debug, Default, Clone)]
pub struct RecordingFxSink {
    pub recorded: VecDeque<TransferFx>,
}

impl TransferFxSink for RecordingFxSink {
    fn push(&mut self, fx: TransferFx) -> Result<(), FxError> {
        if self.recorded.len() == MAX_RECORDED_FX {
            self.recorded.pop_front();
        }
        self.recorded.push_back(fx);
        Ok(())
    }
}

pub(crate) fn publish(sink: &mut dyn TransferFxSink, fx: TransferFx) {
    let transfer_id = fx.transfer_id.clone();
    if let Err(err) = sink.push(fx) {
        tracing::debug!(%transfer_id, %err, "transfer fx dropped");
    }
}
