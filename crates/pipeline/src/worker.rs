//! 워커 풀
//!
//! 한 큐를 `concurrency`개의 워커가 경쟁 소비합니다. 워커는 각자 핸들러와
//! 소비자를 가진 tokio 태스크이며, 상태를 공유하지 않습니다.
//!
//! # 처리 결과 정책
//! - 성공 또는 이벤트 없음: ack
//! - 재시도 가능한 실패: `max_redeliveries`까지 requeue, 이후 dead letter
//! - 영구 실패 (디코딩, 버전, 태스크별 설정 오류): 즉시 dead letter
//! - 브로커 실패: 풀 전체 중단
//!
//! 핸들러는 시작 시 모두 미리 만들며, 하나라도 실패하면 아무것도 소비하지
//! 않고 시작 실패를 반환합니다.

use std::sync::Arc;
use std::time::Duration;

use logrelay_core::broker::{BoxFuture, Broker, Consumer, Delivery};
use logrelay_core::metrics as m;
use logrelay_core::task::Task;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::dispatcher::StageBinding;
use crate::error::{Disposition, StageError};
use crate::fanout::FanoutReport;

/// 태스크 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 이벤트를 다음 스테이지로 발행함
    Published,
    /// 파서 체인이 이벤트를 만들지 않음
    Dropped,
    /// 아웃푸터 fan-out 완료
    Fanned(FanoutReport),
}

/// 스테이지별 태스크 처리기
///
/// 워커마다 하나씩 만들어지며 워커 태스크 안에서만 사용됩니다.
pub trait TaskHandler: Send + 'static {
    /// 디코딩된 태스크를 처리합니다.
    fn handle(&mut self, task: Task) -> BoxFuture<'_, Result<Outcome, StageError>>;
}

/// 워커 실행 한도 (bounded mode)
///
/// 둘 다 `None`이면 종료 신호 전까지 계속 실행합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerLimits {
    /// 워커당 최대 소비 태스크 수
    pub max_tasks: Option<u64>,
    /// 워커당 최대 실행 시간
    pub max_runtime: Option<Duration>,
}

impl WorkerLimits {
    /// 한도 없음
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 한도가 설정되어 있는지 확인합니다.
    pub fn is_bounded(&self) -> bool {
        self.max_tasks.is_some() || self.max_runtime.is_some()
    }
}

/// 워커 하나의 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// 워커 인덱스
    pub index: usize,
    /// 큐에서 꺼낸 태스크 수
    pub consumed: u64,
    /// 다음 스테이지로 발행한 이벤트 수
    pub published: u64,
    /// 이벤트 없이 끝난 태스크 수
    pub dropped: u64,
    /// fan-out을 마친 이벤트 수
    pub fanned_out: u64,
    /// 재전달 요청한 태스크 수
    pub requeued: u64,
    /// dead letter로 보낸 태스크 수
    pub dead_lettered: u64,
}

impl WorkerReport {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Published => self.published += 1,
            Outcome::Dropped => self.dropped += 1,
            Outcome::Fanned(_) => self.fanned_out += 1,
        }
    }
}

/// 워커 풀 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// 워커별 결과 (인덱스 순)
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    /// 모든 워커의 합계
    pub fn total(&self) -> WorkerReport {
        self.workers
            .iter()
            .fold(WorkerReport::default(), |mut acc, w| {
                acc.consumed += w.consumed;
                acc.published += w.published;
                acc.dropped += w.dropped;
                acc.fanned_out += w.fanned_out;
                acc.requeued += w.requeued;
                acc.dead_lettered += w.dead_lettered;
                acc
            })
    }
}

// ─── WorkerPool ──────────────────────────────────────────────────────

/// 한 큐에 대한 워커 풀
pub struct WorkerPool {
    binding: StageBinding,
    broker: Arc<dyn Broker>,
    limits: WorkerLimits,
    max_redeliveries: u32,
}

impl WorkerPool {
    /// 기본 재전달 한도
    pub const DEFAULT_MAX_REDELIVERIES: u32 = 3;

    /// 새 워커 풀을 생성합니다.
    pub fn new(binding: StageBinding, broker: Arc<dyn Broker>) -> Self {
        Self {
            binding,
            broker,
            limits: WorkerLimits::default(),
            max_redeliveries: Self::DEFAULT_MAX_REDELIVERIES,
        }
    }

    /// 실행 한도를 설정합니다.
    pub fn limits(mut self, limits: WorkerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 재전달 한도를 설정합니다.
    pub fn max_redeliveries(mut self, max: u32) -> Self {
        self.max_redeliveries = max;
        self
    }

    /// 바인딩 정보
    pub fn binding(&self) -> &StageBinding {
        &self.binding
    }

    /// 워커를 시작하고 모두 끝날 때까지 기다립니다.
    ///
    /// `factory(index)`로 핸들러를 워커 수만큼 먼저 만듭니다. 워커 하나가
    /// 치명적 에러로 끝나면 나머지 워커도 중단하고 첫 에러를 반환합니다.
    pub async fn run<F, H>(&self, mut factory: F, shutdown: CancellationToken) -> Result<PoolReport, StageError>
    where
        F: FnMut(usize) -> Result<H, StageError>,
        H: TaskHandler,
    {
        let identity = self.binding.identity();
        let concurrency = self.binding.concurrency;
        if concurrency == 0 {
            tracing::warn!(identity = %identity, queue = %self.binding.queue, "concurrency is 0, no workers started");
            return Ok(PoolReport::default());
        }

        let mut handlers = Vec::with_capacity(concurrency);
        for index in 0..concurrency {
            handlers.push(factory(index)?);
        }
        let mut consumers = Vec::with_capacity(concurrency);
        for _ in 0..concurrency {
            consumers.push(self.broker.consume(&self.binding.queue).await?);
        }

        tracing::info!(
            identity = %identity,
            stage = %self.binding.stage,
            queue = %self.binding.queue,
            concurrency,
            bounded = self.limits.is_bounded(),
            "worker pool starting"
        );

        let token = shutdown.child_token();
        let mut workers = JoinSet::new();
        for (index, (handler, consumer)) in handlers.into_iter().zip(consumers).enumerate() {
            let worker = Worker {
                index,
                queue: self.binding.queue.clone(),
                consumer,
                handler,
                limits: self.limits,
                max_redeliveries: self.max_redeliveries,
                shutdown: token.clone(),
            };
            let span = tracing::info_span!("worker", identity = %identity, index);
            workers.spawn(worker.run().instrument(span));
        }

        let mut report = PoolReport::default();
        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(StageError::WorkerAborted {
                    reason: e.to_string(),
                })
            });
            match result {
                Ok(worker) => report.workers.push(worker),
                Err(e) => {
                    tracing::error!(identity = %identity, error = %e, "worker failed, stopping pool");
                    token.cancel();
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        report.workers.sort_by_key(|w| w.index);
        let total = report.total();
        tracing::info!(
            identity = %identity,
            consumed = total.consumed,
            requeued = total.requeued,
            dead_lettered = total.dead_lettered,
            "worker pool stopped"
        );
        Ok(report)
    }
}

// ─── Worker ──────────────────────────────────────────────────────────

struct Worker<H> {
    index: usize,
    queue: String,
    consumer: Box<dyn Consumer>,
    handler: H,
    limits: WorkerLimits,
    max_redeliveries: u32,
    shutdown: CancellationToken,
}

impl<H: TaskHandler> Worker<H> {
    async fn run(mut self) -> Result<WorkerReport, StageError> {
        // 표현할 수 없을 만큼 먼 한도는 한도 없음과 같음
        let deadline = self
            .limits
            .max_runtime
            .and_then(|d| Instant::now().checked_add(d));
        let mut report = WorkerReport {
            index: self.index,
            ..WorkerReport::default()
        };
        tracing::debug!("worker started");

        loop {
            if self.limits.max_tasks.is_some_and(|max| report.consumed >= max) {
                tracing::debug!("task limit reached");
                break;
            }
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::debug!("shutdown requested");
                    break;
                }
                _ = wait_until(deadline) => {
                    tracing::debug!("runtime limit reached");
                    break;
                }
                next = self.consumer.recv() => next?,
            };
            let Some(delivery) = next else {
                tracing::info!("queue closed");
                break;
            };
            report.consumed += 1;
            self.process(delivery, &mut report).await?;
        }

        tracing::debug!(consumed = report.consumed, "worker stopped");
        Ok(report)
    }

    async fn process(&mut self, delivery: Delivery, report: &mut WorkerReport) -> Result<(), StageError> {
        metrics::counter!(m::WORKER_TASKS_CONSUMED_TOTAL, m::LABEL_QUEUE => self.queue.clone())
            .increment(1);
        let started = Instant::now();
        let result = match Task::decode(&delivery.payload) {
            Ok(task) => self.handler.handle(task).await,
            Err(e) => Err(e.into()),
        };
        metrics::histogram!(m::WORKER_TASK_DURATION_SECONDS, m::LABEL_QUEUE => self.queue.clone())
            .record(started.elapsed().as_secs_f64());

        let err = match result {
            Ok(outcome) => {
                report.record(&outcome);
                return Ok(self.consumer.ack(delivery).await?);
            }
            Err(err) => err,
        };

        let requeue = match err.disposition() {
            Disposition::Fatal => {
                // 처리하지 못한 태스크는 가능하면 큐로 되돌림
                if let Err(reject_err) = self.consumer.reject(delivery, true).await {
                    tracing::warn!(error = %reject_err, "could not return task to queue");
                }
                return Err(err);
            }
            Disposition::Retry => delivery.attempt <= self.max_redeliveries,
            Disposition::DeadLetter => false,
        };

        let result_label = if requeue {
            report.requeued += 1;
            tracing::warn!(attempt = delivery.attempt, error = %err, "task failed, requeueing");
            "requeued"
        } else {
            report.dead_lettered += 1;
            tracing::error!(attempt = delivery.attempt, error = %err, "task failed permanently, dead-lettering");
            "dead_lettered"
        };
        metrics::counter!(
            m::WORKER_TASK_FAILURES_TOTAL,
            m::LABEL_QUEUE => self.queue.clone(),
            m::LABEL_RESULT => result_label
        )
        .increment(1);

        Ok(self.consumer.reject(delivery, requeue).await?)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
