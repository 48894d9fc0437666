//! Plan stream consumer

use crate::error::{PlanError, Result};
use crate::event::{self, PlanEvent, PlanStep};
use crate::transport::PlanTransport;
use crate::types::{PlanRequest, PlanRun, PlanStatus, STREAM_FAILED_MESSAGE};
use desk_core::{Generation, GenerationCounter};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle on one started plan run
#[derive(Debug)]
pub struct PlanHandle {
    generation: Generation,
    goal: String,
    run: watch::Receiver<PlanRun>,
}

impl PlanHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Wait for the run to end
    ///
    /// A run superseded by a later `start_plan` resolves as cancelled with no
    /// steps.
    pub async fn finished(mut self) -> PlanRun {
        let generation = self.generation;
        let outcome = self
            .run
            .wait_for(|run| run.generation != generation || run.status.is_terminal())
            .await
            .map(|run| run.clone());

        match outcome {
            Ok(run) if run.generation == generation => run,
            Ok(_) => PlanRun::cancelled(generation, &self.goal),
            Err(_) => {
                let run = self.run.borrow().clone();
                if run.generation == generation && run.status.is_terminal() {
                    run
                } else {
                    PlanRun::cancelled(generation, &self.goal)
                }
            },
        }
    }
}

/// Consumes plan streams for one planning view
///
/// Holds exactly one current [`PlanRun`], published through a watch channel.
/// Starting a plan while another streams aborts the older stream first; its
/// late events can no longer reach the published run.
pub struct PlanStreamConsumer {
    transport: Arc<dyn PlanTransport>,
    generations: GenerationCounter,
    run: Arc<watch::Sender<PlanRun>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlanStreamConsumer {
    pub fn new(transport: Arc<dyn PlanTransport>) -> Self {
        let (run, _) = watch::channel(PlanRun::default());
        Self {
            transport,
            generations: GenerationCounter::new(),
            run: Arc::new(run),
            task: Mutex::new(None),
        }
    }

    /// Receiver observing every change of the current run
    pub fn subscribe(&self) -> watch::Receiver<PlanRun> {
        self.run.subscribe()
    }

    pub fn snapshot(&self) -> PlanRun {
        self.run.borrow().clone()
    }

    /// Start a plan run, superseding the current one
    pub async fn start_plan(&self, request: PlanRequest) -> Result<PlanHandle> {
        let request = request.normalized()?;

        let mut task = self.task.lock().await;
        self.stop(task.take()).await;

        let generation = self.generations.advance();
        self.run.send_replace(PlanRun::streaming(generation, &request.goal));
        info!(%generation, goal = %request.goal, "plan run started");

        let handle = PlanHandle {
            generation,
            goal: request.goal.clone(),
            run: self.run.subscribe(),
        };

        let worker = StreamWorker {
            transport: self.transport.clone(),
            generations: self.generations.clone(),
            run: self.run.clone(),
            generation,
        };
        *task = Some(tokio::spawn(worker.run(request)));

        Ok(handle)
    }

    /// Abort any open stream, marking its run cancelled
    pub async fn close(&self) {
        let mut task = self.task.lock().await;
        self.stop(task.take()).await;
    }

    async fn stop(&self, task: Option<JoinHandle<()>>) {
        let Some(task) = task else {
            return;
        };
        task.abort();
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "plan stream task failed");
            }
        }

        let cancelled = self.run.send_if_modified(|run| {
            if run.status == PlanStatus::Streaming {
                run.status = PlanStatus::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            info!(generation = %self.run.borrow().generation, "plan run cancelled");
        }
    }
}

impl Drop for PlanStreamConsumer {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// Drives one stream into the run it was started for
struct StreamWorker {
    transport: Arc<dyn PlanTransport>,
    generations: GenerationCounter,
    run: Arc<watch::Sender<PlanRun>>,
    generation: Generation,
}

impl StreamWorker {
    async fn run(self, request: PlanRequest) {
        if let Err(e) = self.consume(&request).await {
            let message = match &e {
                PlanError::Server(_) => e.to_string(),
                _ => STREAM_FAILED_MESSAGE.to_string(),
            };
            warn!(generation = %self.generation, error = %e, "plan run failed");
            self.commit(|run| {
                run.status = PlanStatus::Failed;
                run.error = Some(message);
            });
        }
    }

    async fn consume(&self, request: &PlanRequest) -> Result<()> {
        let mut messages = self.transport.open(request).await?;

        while let Some(message) = messages.next().await {
            let message = message?;
            if message.trim().is_empty() || event::is_handshake(&message) {
                continue;
            }

            match PlanEvent::parse(&message)? {
                PlanEvent::Status { message } => {
                    debug!(generation = %self.generation, ?message, "planner status");
                },
                PlanEvent::Step { data } => self.append_step(data),
                PlanEvent::Final {
                    final_answer, context, ..
                } => {
                    self.commit(|run| {
                        run.final_answer = final_answer;
                        run.context = context;
                        run.status = PlanStatus::Completed;
                    });
                    info!(generation = %self.generation, "plan run completed");
                    return Ok(());
                },
                PlanEvent::Error { message } => {
                    return Err(PlanError::Server(message.unwrap_or_else(|| "unknown error".to_string())));
                },
                PlanEvent::Unknown => {
                    debug!(generation = %self.generation, "skipping unknown plan event");
                },
            }
        }

        Err(PlanError::Incomplete)
    }

    fn append_step(&self, mut step: PlanStep) {
        self.commit(|run| {
            if step.index == 0 {
                step.index = u32::try_from(run.steps.len() + 1).unwrap_or(u32::MAX);
            }
            debug!(generation = %self.generation, index = step.index, action = %step.action, "plan step");
            run.steps.push(step);
        });
    }

    /// Apply `update` if this worker's run is still current and streaming
    fn commit(&self, update: impl FnOnce(&mut PlanRun)) {
        let applied = self.generations.is_current(self.generation)
            && self.run.send_if_modified(|run| {
                if run.generation != self.generation || run.status != PlanStatus::Streaming {
                    return false;
                }
                update(run);
                true
            });
        if !applied {
            debug!(generation = %self.generation, "discarding stale plan update");
        }
    }
}
