use tracing::{debug, warn};

use crate::analysis::AnalysisResult;

pub const REFEREE_ALERT: &str = "Something went wrong with the referee! Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Analyzing,
    MatchFound,
}

impl ViewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewState::Idle => "IDLE",
            ViewState::Analyzing => "ANALYZING",
            ViewState::MatchFound => "MATCH_FOUND",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    DragEntered,
    DragLeft,
    FileReceived { file_name: String },
    PreviewReady(String),
    ResponseReceived(AnalysisResult),
    ResponseFailed(String),
    ResetRequested,
}

impl ViewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::DragEntered => "drag_entered",
            ViewEvent::DragLeft => "drag_left",
            ViewEvent::FileReceived { .. } => "file_received",
            ViewEvent::PreviewReady(_) => "preview_ready",
            ViewEvent::ResponseReceived(_) => "response_received",
            ViewEvent::ResponseFailed(_) => "response_failed",
            ViewEvent::ResetRequested => "reset_requested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("event {event} is not allowed while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Client-side jumbotron state. Nothing here outlives one upload cycle.
#[derive(Debug, Clone)]
pub struct StadiumView {
    state: ViewState,
    drag_active: bool,
    file_name: Option<String>,
    user_image: Option<String>,
    pending_result: Option<AnalysisResult>,
    result: Option<AnalysisResult>,
    alert: Option<String>,
}

impl Default for StadiumView {
    fn default() -> Self {
        Self::new()
    }
}

impl StadiumView {
    pub fn new() -> Self {
        StadiumView {
            state: ViewState::Idle,
            drag_active: false,
            file_name: None,
            user_image: None,
            pending_result: None,
            result: None,
            alert: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn user_image(&self) -> Option<&str> {
        self.user_image.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Hands the pending alert to the caller, as a dismissed dialog would.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    fn clear_cycle(&mut self) {
        self.file_name = None;
        self.user_image = None;
        self.pending_result = None;
        self.result = None;
    }

    fn reject(&self, event: &ViewEvent) -> ViewError {
        warn!(
            "View ignored {} while {}",
            event.name(),
            self.state.as_str()
        );
        ViewError::InvalidTransition {
            state: self.state.as_str(),
            event: event.name(),
        }
    }

    /// Both the preview and the response must be in before the reveal.
    fn reveal_if_ready(&mut self) {
        if self.user_image.is_some() && self.pending_result.is_some() {
            self.result = self.pending_result.take();
            self.state = ViewState::MatchFound;
        }
    }

    pub fn handle(&mut self, event: ViewEvent) -> Result<ViewState, ViewError> {
        let before = self.state;
        match (self.state, event) {
            (ViewState::Idle, ViewEvent::DragEntered) => self.drag_active = true,
            (ViewState::Idle, ViewEvent::DragLeft) => self.drag_active = false,
            (_, ViewEvent::DragEntered | ViewEvent::DragLeft) => {}
            (ViewState::Idle, ViewEvent::FileReceived { file_name }) => {
                self.clear_cycle();
                self.drag_active = false;
                self.alert = None;
                self.file_name = Some(file_name);
                self.state = ViewState::Analyzing;
            }
            (ViewState::Analyzing, ViewEvent::PreviewReady(data_url)) => {
                self.user_image = Some(data_url);
                self.reveal_if_ready();
            }
            (ViewState::Analyzing, ViewEvent::ResponseReceived(result)) => {
                self.pending_result = Some(result);
                self.reveal_if_ready();
            }
            (ViewState::Analyzing, ViewEvent::ResponseFailed(detail)) => {
                warn!("Analysis failed: {}", detail);
                self.clear_cycle();
                self.alert = Some(REFEREE_ALERT.to_string());
                self.state = ViewState::Idle;
            }
            (ViewState::MatchFound, ViewEvent::ResetRequested) => {
                self.clear_cycle();
                self.state = ViewState::Idle;
            }
            (_, event) => return Err(self.reject(&event)),
        }

        if before != self.state {
            debug!("View {} -> {}", before.as_str(), self.state.as_str());
        }
        Ok(self.state)
    }
}
