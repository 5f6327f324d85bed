//! Main execution engine - runs the stages of a pipeline in order

use crate::{
    core::{ExecutionStatus, Pipeline, StageState},
    execution::{StageExecutor, StageResult},
    runner::{ImageBuilder, WebhookDispatcher},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
    },
    StageStarted {
        stage_id: String,
    },
    StageCompleted {
        stage_id: String,
        outputs: BTreeMap<String, String>,
    },
    StageSkipped {
        stage_id: String,
        reason: String,
    },
    StageFailed {
        stage_id: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Why a run did not complete
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("stage '{stage}' failed: {error}")]
    StageFailed { stage: String, error: String },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
pub struct ExecutionEngine<B, W> {
    executor: StageExecutor<B, W>,
    event_handlers: Vec<EventHandler>,
}

impl<B: ImageBuilder, W: WebhookDispatcher> ExecutionEngine<B, W> {
    pub fn new(executor: StageExecutor<B, W>) -> Self {
        Self {
            executor,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute every stage in order; the first failure ends the run
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), ExecutionError> {
        let execution_id = pipeline.state.execution_id;
        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
        });

        pipeline.state.start(pipeline.stages.len());
        let mut failure = None;

        // Disabled stages are already skipped; report them up front
        for stage in &pipeline.stages {
            if let StageState::Skipped { reason } = &stage.state {
                self.emit_event(ExecutionEvent::StageSkipped {
                    stage_id: stage.id.clone(),
                    reason: reason.clone(),
                });
            }
        }

        while let Some(stage) = pipeline.next_stage().cloned() {
            if let Some(err) = &failure {
                let ExecutionError::StageFailed { stage: failed, .. } = err;
                let reason = format!("upstream stage '{}' failed", failed);
                self.mark_skipped(pipeline, &stage.id, reason);
                continue;
            }

            if !pipeline.needs_met(&stage) {
                self.mark_skipped(pipeline, &stage.id, "needs not met".to_string());
                continue;
            }

            let started_at = chrono::Utc::now();
            if let Some(s) = pipeline.stage_mut(&stage.id) {
                s.state = StageState::Running { started_at };
            }
            self.emit_event(ExecutionEvent::StageStarted {
                stage_id: stage.id.clone(),
            });

            let result = self.executor.execute(&stage, pipeline).await;

            match result {
                StageResult::Success { outputs } => {
                    pipeline.context.record_outputs(&stage.id, &outputs);
                    if let Some(s) = pipeline.stage_mut(&stage.id) {
                        s.state = StageState::Completed {
                            started_at,
                            completed_at: chrono::Utc::now(),
                        };
                    }
                    info!("Stage {} completed", stage.id);
                    self.emit_event(ExecutionEvent::StageCompleted {
                        stage_id: stage.id.clone(),
                        outputs,
                    });
                }
                StageResult::Skipped { reason } => {
                    warn!("Stage {} skipped: {}", stage.id, reason);
                    self.mark_skipped(pipeline, &stage.id, reason);
                }
                StageResult::Failed { error } => {
                    error!("Stage {} failed: {}", stage.id, error);
                    if let Some(s) = pipeline.stage_mut(&stage.id) {
                        s.state = StageState::Failed {
                            error: error.clone(),
                            started_at,
                            failed_at: chrono::Utc::now(),
                        };
                    }
                    self.emit_event(ExecutionEvent::StageFailed {
                        stage_id: stage.id.clone(),
                        error: error.clone(),
                    });
                    failure = Some(ExecutionError::StageFailed {
                        stage: stage.id.clone(),
                        error,
                    });
                }
            }

            pipeline.update_counts();
        }

        pipeline.update_counts();
        let status = if failure.is_some() {
            pipeline.state.fail();
            ExecutionStatus::Failed
        } else {
            pipeline.state.complete();
            ExecutionStatus::Completed
        };

        info!("Pipeline execution finished: {} - {:?}", pipeline.name, status);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mark_skipped(&self, pipeline: &mut Pipeline, stage_id: &str, reason: String) {
        if let Some(s) = pipeline.stage_mut(stage_id) {
            s.state = StageState::Skipped {
                reason: reason.clone(),
            };
        }
        self.emit_event(ExecutionEvent::StageSkipped {
            stage_id: stage_id.to_string(),
            reason,
        });
    }
}
