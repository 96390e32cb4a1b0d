//! LLM usage accounting for the extraction stage.
//!
//! Tracks what the text-understanding service cost across the lifetime of
//! an orchestrator, so the CLI can report it. Counters only; nothing here
//! enforces a budget.

use parking_lot::RwLock;
use serde::Serialize;

use crate::extractor::TokenUsage;

/// Accumulated LLM usage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of LLM calls made
    pub llm_calls: u32,
}

impl LlmUsage {
    /// Add token usage from one extraction call.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
    }
}

/// Thread-safe usage accumulator shared by the orchestrator.
#[derive(Debug, Default)]
pub struct UsageTracker {
    inner: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage from one extraction call.
    pub fn record(&self, usage: &TokenUsage) {
        self.inner.write().add(usage);
    }

    /// Snapshot the accumulated usage.
    pub fn snapshot(&self) -> LlmUsage {
        *self.inner.read()
    }

    /// Reset all counters.
    pub fn reset(&self) {
        *self.inner.write() = LlmUsage::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate() {
        let tracker = UsageTracker::new();
        tracker.record(&TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 10,
        });
        tracker.record(&TokenUsage {
            prompt_tokens: 50,
            completion_tokens: 5,
        });

        let usage = tracker.snapshot();
        assert_eq!(usage.llm_calls, 2);
        assert_eq!(usage.prompt_tokens, 150);
        assert_eq!(usage.total_tokens, 165);
    }

    #[test]
    fn reset_zeroes_counters() {
        let tracker = UsageTracker::new();
        tracker.record(&TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
        });
        tracker.reset();
        assert_eq!(tracker.snapshot().llm_calls, 0);
    }
}
