//! Stage tracking for the ingest and query flows

use std::fmt;
use std::time::Instant;

use crate::error::Error;

/// A stage of one of the pipeline flows
pub trait FlowStage: Clone + fmt::Debug + PartialEq {
    /// Flow name used in logs
    const FLOW: &'static str;

    /// Starting stage
    fn idle() -> Self;

    /// Failure stage carrying the reason
    fn failed(reason: String) -> Self;

    /// Whether `self` may directly follow `prev`
    fn can_follow(&self, prev: &Self) -> bool;
}

/// `Idle → Extracting → Chunking → Embedding → Indexing → Persisted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStage {
    Idle,
    Extracting,
    Chunking,
    Embedding,
    Indexing,
    Persisted,
    /// Extraction produced no text; nothing was written
    NothingIndexed,
    Failed(String),
}

impl FlowStage for IngestStage {
    const FLOW: &'static str = "ingest";

    fn idle() -> Self {
        IngestStage::Idle
    }

    fn failed(reason: String) -> Self {
        IngestStage::Failed(reason)
    }

    fn can_follow(&self, prev: &Self) -> bool {
        use IngestStage::*;
        matches!(
            (prev, self),
            (Idle, Extracting)
                | (Extracting, Chunking)
                | (Chunking, Embedding)
                | (Chunking, NothingIndexed)
                | (Embedding, Indexing)
                | (Indexing, Persisted)
        ) || (matches!(self, Failed(_)) && !matches!(prev, Persisted | NothingIndexed | Failed(_)))
    }
}

/// `Idle → Retrieving → Composing → Answered`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStage {
    Idle,
    Retrieving,
    Composing,
    Answered,
    Failed(String),
}

impl FlowStage for QueryStage {
    const FLOW: &'static str = "query";

    fn idle() -> Self {
        QueryStage::Idle
    }

    fn failed(reason: String) -> Self {
        QueryStage::Failed(reason)
    }

    fn can_follow(&self, prev: &Self) -> bool {
        use QueryStage::*;
        matches!(
            (prev, self),
            (Idle, Retrieving) | (Retrieving, Composing) | (Composing, Answered)
        ) || (matches!(self, Failed(_)) && !matches!(prev, Answered | Failed(_)))
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStage::Failed(reason) => write!(f, "Failed({})", reason),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStage::Failed(reason) => write!(f, "Failed({})", reason),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Records and logs stage transitions of one flow run
#[derive(Debug)]
pub struct FlowTracker<S: FlowStage> {
    store: String,
    history: Vec<S>,
    started: Instant,
}

impl<S: FlowStage + fmt::Display> FlowTracker<S> {
    pub fn new(store: &str) -> Self {
        Self {
            store: store.to_string(),
            history: vec![S::idle()],
            started: Instant::now(),
        }
    }

    /// Current stage
    pub fn stage(&self) -> &S {
        // history always holds the idle stage
        &self.history[self.history.len() - 1]
    }

    /// Every stage visited, in order
    pub fn history(&self) -> &[S] {
        &self.history
    }

    /// Move to `next`
    pub fn advance(&mut self, next: S) {
        debug_assert!(
            next.can_follow(self.stage()),
            "illegal {} transition {:?} -> {:?}",
            S::FLOW,
            self.stage(),
            next
        );
        tracing::debug!(
            flow = S::FLOW,
            store = %self.store,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "{} -> {}",
            self.stage(),
            next
        );
        self.history.push(next);
    }

    /// Move to the failure stage for `err`
    pub fn fail(&mut self, err: &Error) {
        tracing::error!(
            flow = S::FLOW,
            store = %self.store,
            "{} failed during {}: {}",
            S::FLOW,
            self.stage(),
            err
        );
        self.advance(S::failed(err.to_string()));
    }

    /// Log completion
    pub fn finish(&self) {
        tracing::info!(
            flow = S::FLOW,
            store = %self.store,
            "{} finished in {:.1}s at {}",
            S::FLOW,
            self.started.elapsed().as_secs_f64(),
            self.stage()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_happy_path() {
        let mut flow = FlowTracker::<IngestStage>::new("demo");
        for stage in [
            IngestStage::Extracting,
            IngestStage::Chunking,
            IngestStage::Embedding,
            IngestStage::Indexing,
            IngestStage::Persisted,
        ] {
            flow.advance(stage);
        }
        assert_eq!(flow.stage(), &IngestStage::Persisted);
        assert_eq!(flow.history().len(), 6);
    }

    #[test]
    fn test_ingest_transitions() {
        use IngestStage::*;
        assert!(Extracting.can_follow(&Idle));
        assert!(!Persisted.can_follow(&Embedding));
        assert!(NothingIndexed.can_follow(&Chunking));
        assert!(Failed("x".into()).can_follow(&Embedding));
        assert!(!Failed("x".into()).can_follow(&Persisted));
    }

    #[test]
    fn test_query_failure_recorded() {
        let mut flow = FlowTracker::<QueryStage>::new("demo");
        flow.advance(QueryStage::Retrieving);
        flow.fail(&Error::IndexUnavailable {
            store: "demo".into(),
            reason: "missing".into(),
        });
        assert!(matches!(flow.stage(), QueryStage::Failed(reason) if reason.contains("demo")));
        assert!(!QueryStage::Answered.can_follow(&QueryStage::Retrieving));
    }
}
