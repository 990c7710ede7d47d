//! 스테이지 디스패처
//!
//! 설정을 스테이지 바인딩(큐, 워커 수, 워커 이름)으로 바꾸고, 각 스테이지의
//! 태스크 핸들러를 만들어 [`WorkerPool`]에 넘깁니다.
//!
//! - 파서 스테이지: [`ParseHandler`]가 파서 체인을 적용하고, 이벤트가 나오면
//!   출력 큐에 발행합니다.
//! - 출력 스테이지: [`OutputHandler`]가 이벤트를 모든 아웃푸터에 fan-out합니다.
//!   아웃푸터 실패는 격리되며 태스크 자체는 ack됩니다. 재전달하면 이미
//!   성공한 아웃푸터에 중복 기록되기 때문입니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use logrelay_core::broker::{BoxFuture, Broker};
use logrelay_core::config::Config;
use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::metrics as m;
use logrelay_core::plugin::PluginSpec;
use logrelay_core::task::{ParseTask, Task};
use tokio_util::sync::CancellationToken;

use crate::chain::ParserChain;
use crate::error::StageError;
use crate::fanout::OutputFanout;
use crate::registry::{PluginRegistry, PluginResolver};
use crate::worker::{Outcome, PoolReport, TaskHandler, WorkerLimits, WorkerPool};

/// 워커당 캐시하는 파서 오버라이드 체인 수
const MAX_CACHED_OVERRIDES: usize = 64;

/// 파이프라인 스테이지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 원시 메시지 → 이벤트
    Parse,
    /// 이벤트 → 싱크
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parser"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// 스테이지와 큐의 연결 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBinding {
    /// 스테이지 종류
    pub stage: Stage,
    /// 소비할 큐 이름
    pub queue: String,
    /// 워커 수
    pub concurrency: usize,
    /// 워커 이름 접두어
    pub worker_name: String,
}

impl StageBinding {
    /// 파서 스테이지 바인딩
    pub fn parser(config: &Config) -> Self {
        Self {
            stage: Stage::Parse,
            queue: config.parser_queue.clone(),
            concurrency: config.parser_workers,
            worker_name: config.parser_worker_name.clone(),
        }
    }

    /// 출력 스테이지 바인딩
    pub fn output(config: &Config) -> Self {
        Self {
            stage: Stage::Output,
            queue: config.output_queue.clone(),
            concurrency: config.output_workers,
            worker_name: config.output_worker_name.clone(),
        }
    }

    /// 워커 식별자: `{hostname}-{worker_name}`
    pub fn identity(&self) -> String {
        format!("{}-{}", hostname(), self.worker_name)
    }
}

/// 현재 호스트 이름
pub fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

// ─── ParseHandler ────────────────────────────────────────────────────

/// 파서 스테이지 핸들러
pub struct ParseHandler {
    chain: ParserChain,
    resolver: Arc<PluginResolver>,
    overrides: HashMap<String, Result<ParserChain, String>>,
    broker: Arc<dyn Broker>,
    output_queue: String,
}

impl ParseHandler {
    /// 기본 파서 목록을 해석해 핸들러를 생성합니다.
    pub fn new(
        resolver: Arc<PluginResolver>,
        parsers: &[PluginSpec],
        broker: Arc<dyn Broker>,
        output_queue: impl Into<String>,
    ) -> Result<Self, PluginError> {
        let chain = ParserChain::from_specs(&resolver, parsers)?;
        if chain.is_empty() {
            tracing::warn!("no parsers configured, every message will be dropped");
        }
        Ok(Self {
            chain,
            resolver,
            overrides: HashMap::new(),
            broker,
            output_queue: output_queue.into(),
        })
    }

    /// 기본 파서 체인
    pub fn chain(&self) -> &ParserChain {
        &self.chain
    }

    /// 캐시된 오버라이드 체인 수 (실패 포함)
    pub fn cached_overrides(&self) -> usize {
        self.overrides.len()
    }

    /// 태스크에 맞는 체인을 골라 메시지를 파싱합니다.
    ///
    /// 태스크가 `parsers`를 지정하면 그 목록으로 만든 체인을 사용하며, 목록의
    /// JSON 표현을 키로 캐시합니다. 해석 실패도 캐시되어 같은 목록은 다시
    /// 해석하지 않습니다.
    pub fn apply(&mut self, task: &ParseTask) -> Result<Option<Event>, StageError> {
        let chain = match &task.parsers {
            None => &self.chain,
            Some(specs) => {
                let key = serde_json::to_string(specs).map_err(|e| StageError::InvalidOverride {
                    reason: e.to_string(),
                })?;
                if self.overrides.len() >= MAX_CACHED_OVERRIDES && !self.overrides.contains_key(&key) {
                    tracing::debug!(entries = self.overrides.len(), "parser override cache full, clearing");
                    self.overrides.clear();
                }
                let resolver = &self.resolver;
                let cached = self.overrides.entry(key).or_insert_with(|| {
                    ParserChain::from_specs(resolver, specs).map_err(|e| {
                        tracing::warn!(error = %e, "parser override rejected");
                        e.to_string()
                    })
                });
                match cached {
                    Ok(chain) => &*chain,
                    Err(reason) => {
                        return Err(StageError::InvalidOverride {
                            reason: reason.clone(),
                        });
                    }
                }
            }
        };
        Ok(chain.apply(&task.message)?)
    }
}

impl fmt::Debug for ParseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseHandler")
            .field("chain", &self.chain)
            .field("cached_overrides", &self.overrides.len())
            .field("output_queue", &self.output_queue)
            .finish_non_exhaustive()
    }
}

impl TaskHandler for ParseHandler {
    fn handle(&mut self, task: Task) -> BoxFuture<'_, Result<Outcome, StageError>> {
        Box::pin(async move {
            let task = task.into_parse()?;
            let Some(event) = self.apply(&task)? else {
                metrics::counter!(m::PARSER_MESSAGES_DROPPED_TOTAL).increment(1);
                tracing::debug!("no event produced, message dropped");
                return Ok(Outcome::Dropped);
            };
            let payload = Task::from(event).encode()?;
            self.broker.publish(&self.output_queue, payload).await?;
            metrics::counter!(m::PARSER_EVENTS_PUBLISHED_TOTAL).increment(1);
            Ok(Outcome::Published)
        })
    }
}

// ─── OutputHandler ───────────────────────────────────────────────────

/// 출력 스테이지 핸들러
#[derive(Debug)]
pub struct OutputHandler {
    fanout: OutputFanout,
}

impl OutputHandler {
    /// 아웃푸터 목록을 해석해 핸들러를 생성합니다.
    pub fn new(resolver: &PluginResolver, outputs: &[PluginSpec]) -> Result<Self, PluginError> {
        let fanout = OutputFanout::from_specs(resolver, outputs)?;
        if fanout.is_empty() {
            tracing::warn!("no outputs configured, events will be discarded");
        }
        Ok(Self { fanout })
    }

    /// 아웃푸터 fan-out
    pub fn fanout(&self) -> &OutputFanout {
        &self.fanout
    }
}

impl TaskHandler for OutputHandler {
    fn handle(&mut self, task: Task) -> BoxFuture<'_, Result<Outcome, StageError>> {
        Box::pin(async move {
            let task = task.into_output()?;
            let report = self.fanout.dispatch(&task.event);
            if !report.is_clean() {
                tracing::warn!(
                    delivered = report.delivered(),
                    failed = report.failed(),
                    "some outputers failed"
                );
            }
            Ok(Outcome::Fanned(report))
        })
    }
}

// ─── StageDispatcher ─────────────────────────────────────────────────

/// 설정 기반 스테이지 실행기
///
/// # 사용 예시
/// ```ignore
/// let config = ConfigCell::from_env().get();
/// let broker = broker::connect(&config.broker_url, &config.broker_options)?;
/// let dispatcher = StageDispatcher::new(config, Arc::new(PluginRegistry::with_builtins()), broker);
/// dispatcher.run_parsers(shutdown).await?;
/// ```
pub struct StageDispatcher {
    config: Arc<Config>,
    resolver: Arc<PluginResolver>,
    broker: Arc<dyn Broker>,
    limits: WorkerLimits,
}

impl StageDispatcher {
    /// 새 디스패처를 생성합니다.
    pub fn new(config: Arc<Config>, registry: Arc<PluginRegistry>, broker: Arc<dyn Broker>) -> Self {
        let resolver = Arc::new(PluginResolver::new(registry, &config));
        Self {
            config,
            resolver,
            broker,
            limits: WorkerLimits::default(),
        }
    }

    /// 워커 실행 한도를 설정합니다.
    pub fn limits(mut self, limits: WorkerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 설정
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// 플러그인 리졸버
    pub fn resolver(&self) -> &Arc<PluginResolver> {
        &self.resolver
    }

    /// 브로커
    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// 임의의 바인딩과 핸들러 팩토리로 워커 풀을 실행합니다.
    pub async fn run_stage<F, H>(
        &self,
        binding: StageBinding,
        factory: F,
        shutdown: CancellationToken,
    ) -> Result<PoolReport, StageError>
    where
        F: FnMut(usize) -> Result<H, StageError>,
        H: TaskHandler,
    {
        WorkerPool::new(binding, Arc::clone(&self.broker))
            .limits(self.limits)
            .max_redeliveries(self.config.max_redeliveries)
            .run(factory, shutdown)
            .await
    }

    /// 파서 워커 풀을 실행합니다.
    pub async fn run_parsers(&self, shutdown: CancellationToken) -> Result<PoolReport, StageError> {
        let resolver = Arc::clone(&self.resolver);
        let broker = Arc::clone(&self.broker);
        let parsers = self.config.parsers.clone();
        let output_queue = self.config.output_queue.clone();
        self.run_stage(
            StageBinding::parser(&self.config),
            move |_| {
                Ok(ParseHandler::new(
                    Arc::clone(&resolver),
                    &parsers,
                    Arc::clone(&broker),
                    output_queue.clone(),
                )?)
            },
            shutdown,
        )
        .await
    }

    /// 출력 워커 풀을 실행합니다.
    pub async fn run_outputs(&self, shutdown: CancellationToken) -> Result<PoolReport, StageError> {
        let resolver = Arc::clone(&self.resolver);
        let outputs = self.config.outputs.clone();
        self.run_stage(
            StageBinding::output(&self.config),
            move |_| Ok(OutputHandler::new(&resolver, &outputs)?),
            shutdown,
        )
        .await
    }

    /// 파서 큐에 태스크 하나를 발행합니다.
    pub async fn submit(&self, task: ParseTask) -> Result<(), StageError> {
        let payload = Task::from(task).encode()?;
        self.broker.publish(&self.config.parser_queue, payload).await?;
        Ok(())
    }
}

impl fmt::Debug for StageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDispatcher")
            .field("broker", &self.broker.name())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
