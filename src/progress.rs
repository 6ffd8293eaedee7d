use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Workflow step a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validation,
    Enrichment,
}

/// One row finished within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Receives row-by-row progress from the validation and enrichment steps.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards progress.
impl ProgressSink for () {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards progress over a channel. A dropped receiver is ignored.
impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Logs progress through `tracing` at roughly every tenth of the stage.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        let step = (event.total / 10).max(1);
        if event.completed % step == 0 || event.completed == event.total {
            tracing::info!(
                "{:?}: {}/{} rows ({:.0}%)",
                event.stage,
                event.completed,
                event.total,
                event.fraction() * 100.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_of_empty_stage_is_complete() {
        let event = ProgressEvent {
            stage: Stage::Validation,
            completed: 0,
            total: 0,
        };
        assert_eq!(event.fraction(), 1.0);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let event = ProgressEvent {
            stage: Stage::Enrichment,
            completed: 1,
            total: 4,
        };

        tx.report(event);

        assert_eq!(rx.recv().await, Some(event));
        assert_eq!(event.fraction(), 0.25);
    }
}
