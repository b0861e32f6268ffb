// THEORY:
// The `ParallelPipeline` is the concurrent twin of `SelectionPipeline`. Evaluating
// a candidate is a pure function of its URL and the image source, so candidates
// can be fetched and analysed on a pool of workers. Ranking is not incremental:
// each group is only ranked once every one of its evaluations has come back, over
// a frozen per-group buffer. No locks are needed because results travel back over
// oneshot channels into those buffers.
//
// A single dispatcher hands tasks to the workers round-robin. Each worker runs one
// evaluation at a time, so the worker count bounds the number of downloads in
// flight.

use crate::config::SelectorConfig;
use crate::core_modules::best_image_selector::{
    BestImageSelector, CandidateEvaluation, GroupReport, group_candidates,
};
use crate::core_modules::candidate::{CandidateImage, SelectionResult};
use crate::core_modules::image_evaluator::{ImageEvaluator, ImageMetrics};
use crate::core_modules::image_fetcher::ImageSource;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub struct EvaluationTask {
    pub candidate: CandidateImage,
    pub result_sender: oneshot::Sender<ImageMetrics>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<EvaluationTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers (at least one) on the current runtime.
    pub fn new<S: ImageSource + 'static>(
        evaluator: Arc<ImageEvaluator<S>>,
        worker_count: usize,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<EvaluationTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<EvaluationTask>())
            .unzip();

        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let evaluator = Arc::clone(&evaluator);
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    debug!(worker_id, url = %task.candidate.url, "evaluating candidate");
                    let metrics = evaluator.evaluate(&task.candidate).await;
                    let _ = task.result_sender.send(metrics);
                }
            }));
        }

        Self { task_sender, workers }
    }

    /// Queues a candidate; the receiver resolves once a worker has evaluated it.
    pub fn submit(&self, candidate: CandidateImage) -> oneshot::Receiver<ImageMetrics> {
        let (result_sender, result_receiver) = oneshot::channel();
        if let Err(error) = self.task_sender.send(EvaluationTask { candidate, result_sender }) {
            // Dropping the task drops its sender, so the receiver reports the failure.
            warn!(url = %error.0.candidate.url, "worker pool is closed");
        }
        result_receiver
    }

    /// Stops accepting work and waits for queued evaluations to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

pub struct ParallelPipeline {
    config: Arc<SelectorConfig>,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    pub fn new<S: ImageSource + 'static>(
        source: S,
        config: SelectorConfig,
        worker_count: usize,
    ) -> Self {
        let config = Arc::new(config);
        let evaluator = Arc::new(ImageEvaluator::new(source, Arc::clone(&config)));
        Self {
            config,
            worker_pool: WorkerPool::new(evaluator, worker_count),
        }
    }

    pub async fn select(&self, candidates: &[CandidateImage]) -> Vec<SelectionResult> {
        self.generate_reports(candidates)
            .await
            .iter()
            .filter_map(GroupReport::selection)
            .collect()
    }

    pub async fn generate_reports(&self, candidates: &[CandidateImage]) -> Vec<GroupReport> {
        let groups = group_candidates(candidates);

        // Queue every candidate up front; groups are still ranked one at a time.
        let pending: Vec<Vec<oneshot::Receiver<ImageMetrics>>> = groups
            .iter()
            .map(|group| {
                group
                    .candidates
                    .iter()
                    .map(|candidate| self.worker_pool.submit(candidate.clone()))
                    .collect()
            })
            .collect();

        let selector = BestImageSelector::new(&self.config);
        let mut reports = Vec::with_capacity(groups.len());
        for (group, receivers) in groups.iter().zip(pending) {
            let results = join_all(receivers).await;
            let evaluations = group
                .candidates
                .iter()
                .zip(results)
                .map(|(candidate, result)| CandidateEvaluation {
                    url: candidate.url.clone(),
                    metrics: result.unwrap_or_else(|_| {
                        warn!(url = %candidate.url, "evaluation was dropped by the worker pool");
                        ImageMetrics::UNUSABLE
                    }),
                })
                .collect();
            reports.push(selector.decide(group, evaluations));
        }

        reports
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
