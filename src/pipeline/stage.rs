use serde::Serialize;

use super::error::PipelineError;

/// Lifecycle of a single request.
///
/// `Received → Retrieving → Scoring → Explaining → Assembling → Done`, with any
/// non-terminal stage able to move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Retrieving,
    Scoring,
    Explaining,
    Assembling,
    Done,
    Failed,
}

impl PipelineStage {
    /// The only stage that may follow this one on the success path.
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Received => Some(PipelineStage::Retrieving),
            PipelineStage::Retrieving => Some(PipelineStage::Scoring),
            PipelineStage::Scoring => Some(PipelineStage::Explaining),
            PipelineStage::Explaining => Some(PipelineStage::Assembling),
            PipelineStage::Assembling => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Scoring => "scoring",
            PipelineStage::Explaining => "explaining",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strictly sequential stage tracker for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrace {
    current: PipelineStage,
    history: Vec<PipelineStage>,
}

impl Default for StageTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTrace {
    /// Starts in `Received`.
    pub fn new() -> Self {
        Self {
            current: PipelineStage::Received,
            history: vec![PipelineStage::Received],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    /// Every stage entered so far, in order.
    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    /// Moves to `to`, which must be the direct successor of the current stage.
    pub fn advance(&mut self, to: PipelineStage) -> Result<(), PipelineError> {
        if self.current.next() != Some(to) {
            return Err(PipelineError::StageOrder {
                from: self.current,
                to,
            });
        }
        self.current = to;
        self.history.push(to);
        Ok(())
    }

    /// Moves to `Failed` and returns the stage that failed.
    ///
    /// Failing an already-terminal trace leaves it unchanged.
    pub fn fail(&mut self) -> PipelineStage {
        let failed_in = self.current;
        if !failed_in.is_terminal() {
            self.current = PipelineStage::Failed;
            self.history.push(PipelineStage::Failed);
        }
        failed_in
    }
}
