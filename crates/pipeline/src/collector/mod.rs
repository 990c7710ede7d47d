//! 입력 수집 루프
//!
//! 설정의 `inputs`를 해석해 주기적으로 폴링하고, 수집한 각 라인을
//! [`ParseTask`]로 파서 큐에 발행합니다.
//!
//! 입력 하나의 폴링 실패는 경고로 남기고 다음 입력으로 넘어갑니다.
//! 발행 실패(브로커 에러)는 루프를 중단합니다.

pub mod file;

use std::sync::Arc;
use std::time::Duration;

use logrelay_core::broker::Broker;
use logrelay_core::config::Config;
use logrelay_core::metrics as m;
use logrelay_core::plugin::Input;
use logrelay_core::task::{ParseTask, Task};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;
use crate::registry::PluginResolver;

/// 기본 폴링 주기
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// 최소 폴링 주기 (0은 타이머가 허용하지 않음)
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 입력 루프 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputReport {
    /// 완료한 폴링 라운드 수
    pub iterations: u64,
    /// 발행한 태스크 수
    pub published: u64,
    /// 실패한 폴링 수
    pub poll_failures: u64,
}

/// 입력 폴링 루프
pub struct InputRunner {
    inputs: Vec<Box<dyn Input>>,
    broker: Arc<dyn Broker>,
    queue: String,
    interval: Duration,
    max_iterations: Option<u64>,
}

impl InputRunner {
    /// 입력 목록과 대상 큐로 생성합니다.
    pub fn new(inputs: Vec<Box<dyn Input>>, broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            inputs,
            broker,
            queue: queue.into(),
            interval: DEFAULT_POLL_INTERVAL,
            max_iterations: None,
        }
    }

    /// 설정의 `inputs`를 해석해 생성합니다.
    ///
    /// 해석 실패는 시작 실패로 취급합니다.
    pub fn from_config(
        config: &Config,
        resolver: &PluginResolver,
        broker: Arc<dyn Broker>,
    ) -> Result<Self, StageError> {
        let inputs = resolver.resolve_inputs(&config.inputs)?;
        Ok(Self::new(inputs, broker, config.parser_queue.clone()))
    }

    /// 폴링 주기를 설정합니다. [`MIN_POLL_INTERVAL`]보다 짧으면 올려 잡습니다.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// 최대 폴링 라운드 수를 설정합니다 (bounded mode).
    pub fn max_iterations(mut self, max: Option<u64>) -> Self {
        self.max_iterations = max;
        self
    }

    /// 해석된 입력 수
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// 종료 신호 또는 라운드 한도까지 폴링합니다.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<InputReport, StageError> {
        let mut report = InputReport::default();
        if self.inputs.is_empty() {
            tracing::warn!("no inputs configured");
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.max_iterations.is_some_and(|max| report.iterations >= max) {
                tracing::info!(iterations = report.iterations, "iteration limit reached");
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("input runner shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.poll_round(&mut report).await?;
            report.iterations += 1;
        }

        Ok(report)
    }

    async fn poll_round(&mut self, report: &mut InputReport) -> Result<(), StageError> {
        for input in &mut self.inputs {
            let lines = match input.poll() {
                Ok(lines) => lines,
                Err(e) => {
                    report.poll_failures += 1;
                    tracing::warn!(input = input.name(), error = %e, "input poll failed");
                    continue;
                }
            };
            if lines.is_empty() {
                continue;
            }

            let name = input.name().to_owned();
            for line in lines {
                let payload = Task::from(ParseTask::new(line)).encode()?;
                self.broker.publish(&self.queue, payload).await?;
                report.published += 1;
                metrics::counter!(m::INPUT_LINES_COLLECTED_TOTAL, m::LABEL_PLUGIN => name.clone())
                    .increment(1);
            }
            tracing::debug!(input = %name, published = report.published, "input lines published");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use logrelay_core::error::PluginError;
    use std::collections::VecDeque;

    struct Scripted {
        rounds: VecDeque<Result<Vec<String>, PluginError>>,
    }

    impl Input for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn poll(&mut self) -> Result<Vec<String>, PluginError> {
            self.rounds.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[tokio::test]
    async fn zero_interval_is_raised_to_minimum() {
        let broker = Arc::new(MemoryBroker::new());
        let input = Scripted {
            rounds: VecDeque::from(vec![Ok(vec!["a".to_owned()])]),
        };
        let mut runner = InputRunner::new(vec![Box::new(input)], broker.clone(), "parsers")
            .interval(Duration::ZERO)
            .max_iterations(Some(2));

        let report = runner.run(CancellationToken::new()).await.unwrap();
        assert_eq!(report.iterations, 2);
        assert_eq!(broker.pending("parsers"), 1);
    }

    #[tokio::test]
    async fn publishes_each_line_as_parse_task() {
        let broker = Arc::new(MemoryBroker::new());
        let input = Scripted {
            rounds: VecDeque::from(vec![
                Ok(vec!["a".to_owned(), "b".to_owned()]),
                Err(PluginError::transform("scripted", "temporarily unavailable")),
                Ok(vec!["c".to_owned()]),
            ]),
        };
        let mut runner = InputRunner::new(vec![Box::new(input)], broker.clone(), "parsers")
            .interval(Duration::from_millis(1))
            .max_iterations(Some(3));

        let report = runner.run(CancellationToken::new()).await.unwrap();
        assert_eq!(report.iterations, 3);
        assert_eq!(report.published, 3);
        assert_eq!(report.poll_failures, 1);
        assert_eq!(broker.pending("parsers"), 3);

        let mut consumer = broker.consume("parsers").await.unwrap();
        let first = consumer.recv().await.unwrap().unwrap();
        let task = Task::decode(&first.payload).unwrap().into_parse().unwrap();
        assert_eq!(task.message, "a");
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let broker = Arc::new(MemoryBroker::new());
        let mut runner = InputRunner::new(Vec::new(), broker, "parsers");
        let token = CancellationToken::new();
        token.cancel();

        let report = runner.run(token).await.unwrap();
        assert_eq!(report.iterations, 0);
    }
}
