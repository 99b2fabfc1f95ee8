//! Job intake loop.
//!
//! Polls the shared queue, runs leased jobs through the pipeline and
//! reports the outcome back. Concurrency is bounded by the configured
//! worker slots; a slot that dies mid-job leaves a lease behind, which
//! the recovery loop (or the next worker start) returns to the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tracing::{error, info, warn};

use courseforge_core::pipeline::CoursePipeline;
use courseforge_core::queue::{JobQueue, LeasedJob, QueueConfig};

use crate::metrics::{JOBS_IN_FLIGHT, QUEUE_DEPTH, STALE_JOBS_RECOVERED};

/// How often expired leases are swept back into the queue.
const RECOVERY_INTERVAL_SECS: u64 = 60;

pub struct JobRunner {
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<CoursePipeline>,
    config: QueueConfig,
    running: Arc<AtomicBool>,
    slots: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobRunner {
    pub fn new(queue: Arc<dyn JobQueue>, pipeline: Arc<CoursePipeline>, config: QueueConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let slots = Arc::new(Semaphore::new(config.worker_slots));

        Self {
            queue,
            pipeline,
            config,
            running: Arc::new(AtomicBool::new(false)),
            slots,
            shutdown_tx,
        }
    }

    /// Start the runner (spawns background loops).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Job runner already running");
            return;
        }

        info!(worker_slots = self.config.worker_slots, "Starting job runner");

        // Jobs leased by a previous process that died keep their lease
        // until it expires; sweep them before taking new work.
        match self.queue.recover_stale() {
            Ok(0) => {}
            Ok(recovered) => {
                warn!("Recovered {} jobs from expired leases at startup", recovered);
                STALE_JOBS_RECOVERED.inc_by(recovered as u64);
            }
            Err(e) => error!("Stale job recovery failed at startup: {}", e),
        }

        self.spawn_lease_loop();
        self.spawn_recovery_loop();

        info!("Job runner started");
    }

    /// Stop the runner gracefully.
    ///
    /// Stops leasing new work and signals the loops. Jobs already in
    /// flight are abandoned when the process exits; their leases expire
    /// and the queue re-runs them.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Job runner not running");
            return;
        }

        info!("Stopping job runner");

        let _ = self.shutdown_tx.send(());

        let in_flight = self.config.worker_slots - self.slots.available_permits();
        if in_flight > 0 {
            warn!(
                "{} jobs still in flight, their leases will be recovered",
                in_flight
            );
        }

        tokio::time::sleep(Duration::from_millis(500)).await;

        info!("Job runner stopped");
    }

    /// Spawn the lease/process loop task.
    fn spawn_lease_loop(&self) {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let pipeline = Arc::clone(&self.pipeline);
        let slots = Arc::clone(&self.slots);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Lease loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Lease loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        // Every slot busy: check again next tick.
                        let permit = match Arc::clone(&slots).try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => continue,
                        };

                        match queue.lease_next() {
                            Ok(Some(leased)) => {
                                let queue = Arc::clone(&queue);
                                let pipeline = Arc::clone(&pipeline);
                                tokio::spawn(async move {
                                    let _permit = permit;
                                    JOBS_IN_FLIGHT.inc();
                                    Self::process_leased(queue, pipeline, leased).await;
                                    JOBS_IN_FLIGHT.dec();
                                });
                            }
                            Ok(None) => drop(permit),
                            Err(e) => {
                                warn!("Failed to lease next job: {}", e);
                                drop(permit);
                            }
                        }
                    }
                }
            }
            info!("Lease loop stopped");
        });
    }

    /// Spawn the stale-lease recovery loop task.
    fn spawn_recovery_loop(&self) {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Recovery loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Recovery loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(RECOVERY_INTERVAL_SECS)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        match queue.recover_stale() {
                            Ok(0) => {}
                            Ok(recovered) => {
                                warn!("Recovered {} jobs from expired leases", recovered);
                                STALE_JOBS_RECOVERED.inc_by(recovered as u64);
                            }
                            Err(e) => warn!("Stale job recovery failed: {}", e),
                        }

                        if let Ok(depth) = queue.depth() {
                            QUEUE_DEPTH.set(depth);
                        }
                    }
                }
            }
            info!("Recovery loop stopped");
        });
    }

    /// Run one leased job and report its outcome to the queue.
    async fn process_leased(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<CoursePipeline>,
        leased: LeasedJob,
    ) {
        info!(
            job_id = %leased.id,
            progress_id = %leased.job.progress_id,
            attempt = leased.job.attempts_made + 1,
            "Processing generation job"
        );

        match pipeline.process(leased.job).await {
            Ok(package) => {
                info!(
                    job_id = %leased.id,
                    course_id = %package.course_id,
                    videos = package.videos.len(),
                    "Generation job completed"
                );
                if let Err(e) = queue.complete(&leased.id) {
                    error!(job_id = %leased.id, "Failed to mark job complete: {}", e);
                }
            }
            Err(e) => {
                warn!(job_id = %leased.id, "Generation job failed: {}", e);
                if let Err(qe) = queue.fail(&leased.id, &e.to_string()) {
                    error!(job_id = %leased.id, "Failed to record job failure: {}", qe);
                }
            }
        }
    }
}
