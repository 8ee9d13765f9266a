//! Session state machine.
//!
//! Tracks one user session through idle → loading → succeeded/failed, with
//! pure transition functions and no rendering dependency. Selecting an image
//! always resets to idle and bumps an epoch counter; a completion carrying a
//! stale epoch is discarded, so an in-flight response can never overwrite a
//! newer selection.

use serde::Serialize;
use thiserror::Error;

use crate::diagnosis::AnalysisResult;
use crate::error::AnalysisError;
use crate::image::ImagePayload;

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Status {
    Idle,
    Loading,
    #[serde(rename_all = "camelCase")]
    Succeeded { result: AnalysisResult },
    #[serde(rename_all = "camelCase")]
    Failed { message: String },
}

/// Rejected transition. These are guard failures, not analysis errors:
/// the state is left untouched and no network call happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no image is staged for analysis")]
    NoImageStaged,

    #[error("an analysis is already in progress")]
    AnalysisInFlight,
}

/// Proof that an analysis was started against a particular selection.
/// Handed back to [`Session::finish`] so stale completions can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket {
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    staged: Option<ImagePayload>,
    status: Status,
    epoch: u64,
}

impl Default for Status {
    fn default() -> Self {
        Status::Idle
    }
}

impl Session {
    /// A fresh session: idle, nothing staged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn staged(&self) -> Option<&ImagePayload> {
        self.staged.as_ref()
    }

    /// Stage a newly selected image. Valid from any state: clears any prior
    /// result or error and returns to idle. Any analysis still in flight for
    /// the previous selection becomes stale.
    pub fn select_image(&mut self, payload: ImagePayload) {
        self.staged = Some(payload);
        self.status = Status::Idle;
        self.epoch += 1;
    }

    /// Move to loading and hand out a ticket plus the payload to analyze.
    /// Fails without a transition when nothing is staged or an analysis is
    /// already running.
    pub fn start_analysis(&mut self) -> Result<(AnalysisTicket, ImagePayload), SessionError> {
        if self.status == Status::Loading {
            return Err(SessionError::AnalysisInFlight);
        }
        let payload = self.staged.clone().ok_or(SessionError::NoImageStaged)?;

        self.status = Status::Loading;
        Ok((AnalysisTicket { epoch: self.epoch }, payload))
    }

    /// Record the outcome of the analysis started with `ticket`. Returns
    /// false, leaving the state untouched, if a newer image was selected
    /// while the request was in flight.
    pub fn finish(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> bool {
        if ticket.epoch != self.epoch || self.status != Status::Loading {
            return false;
        }

        self.status = match outcome {
            Ok(result) => Status::Succeeded { result },
            Err(err) => Status::Failed {
                message: err.user_message(),
            },
        };
        true
    }
}
