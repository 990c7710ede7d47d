//! 출력 fan-out
//!
//! 하나의 이벤트를 모든 아웃푸터에 순서대로 보냅니다. 아웃푸터끼리는
//! 결과를 주고받지 않으며, 한 아웃푸터의 실패는 기록만 하고 나머지
//! 아웃푸터는 계속 실행합니다.

use std::fmt;

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::metrics as m;
use logrelay_core::plugin::{Outputer, PluginSpec};

use crate::registry::PluginResolver;

/// 아웃푸터 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStatus {
    /// 싱크에 기록됨
    Delivered,
    /// skip 필터로 건너뜀
    Skipped,
    /// 실패 (에러 메시지)
    Failed(String),
}

/// 이벤트 하나에 대한 fan-out 결과 (아웃푸터 순서대로)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// `(아웃푸터 이름, 결과)` 목록
    pub results: Vec<(String, OutputStatus)>,
}

impl FanoutReport {
    /// 기록 성공 수
    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, OutputStatus::Delivered))
    }

    /// 건너뛴 수
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutputStatus::Skipped))
    }

    /// 실패 수
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutputStatus::Failed(_)))
    }

    /// 실패 없이 끝났는지 확인합니다.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&OutputStatus) -> bool) -> usize {
        self.results.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// 순서 있는 아웃푸터 목록
#[derive(Default)]
pub struct OutputFanout {
    outputers: Vec<Box<dyn Outputer>>,
}

impl OutputFanout {
    /// 아웃푸터 목록으로 생성합니다.
    pub fn new(outputers: Vec<Box<dyn Outputer>>) -> Self {
        Self { outputers }
    }

    /// 스펙 목록을 해석해 생성합니다.
    pub fn from_specs(resolver: &PluginResolver, specs: &[PluginSpec]) -> Result<Self, PluginError> {
        Ok(Self::new(resolver.resolve_outputers(specs)?))
    }

    /// 이벤트를 모든 아웃푸터에 보냅니다.
    pub fn dispatch(&mut self, event: &Event) -> FanoutReport {
        let mut report = FanoutReport::default();
        for outputer in &mut self.outputers {
            let name = outputer.name().to_owned();
            let status = if outputer.should_skip(event) {
                metrics::counter!(m::OUTPUT_SKIPPED_TOTAL, m::LABEL_PLUGIN => name.clone())
                    .increment(1);
                OutputStatus::Skipped
            } else {
                match outputer.run(event) {
                    Ok(()) => {
                        metrics::counter!(m::OUTPUT_DELIVERED_TOTAL, m::LABEL_PLUGIN => name.clone())
                            .increment(1);
                        OutputStatus::Delivered
                    }
                    Err(e) => {
                        tracing::error!(outputer = %name, error = %e, "outputer failed");
                        metrics::counter!(m::OUTPUT_FAILURES_TOTAL, m::LABEL_PLUGIN => name.clone())
                            .increment(1);
                        OutputStatus::Failed(e.to_string())
                    }
                }
            };
            report.results.push((name, status));
        }
        report
    }

    /// 아웃푸터 수
    pub fn len(&self) -> usize {
        self.outputers.len()
    }

    /// 빈 fan-out인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.outputers.is_empty()
    }

    /// 아웃푸터 이름 목록 (순서대로)
    pub fn names(&self) -> Vec<&str> {
        self.outputers.iter().map(|o| o.name()).collect()
    }
}

impl fmt::Debug for OutputFanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFanout")
            .field("outputers", &self.names())
            .finish()
    }
}
