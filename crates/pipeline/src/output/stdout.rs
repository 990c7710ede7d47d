//! 표준 출력 아웃푸터

use std::fmt;
use std::io::{self, Write};

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::plugin::{Outputer, PluginOptions, SkipFilter};

use super::write_json_line;

/// 이벤트마다 한 줄의 compact JSON을 쓰는 아웃푸터
///
/// 기본 대상은 프로세스 표준 출력이며, 테스트에서는 [`StdoutOutputer::with_writer`]로
/// 임의의 writer를 주입합니다.
pub struct StdoutOutputer {
    skip: SkipFilter,
    writer: Box<dyn Write + Send>,
}

impl StdoutOutputer {
    /// 플러그인 옵션으로 생성합니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Self::with_writer(options, Box::new(io::stdout()))
    }

    /// 지정한 writer로 쓰는 아웃푸터를 생성합니다.
    pub fn with_writer(
        options: &PluginOptions,
        writer: Box<dyn Write + Send>,
    ) -> Result<Self, PluginError> {
        Ok(Self {
            skip: SkipFilter::from_options(options)?,
            writer,
        })
    }
}

impl fmt::Debug for StdoutOutputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutOutputer")
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

impl Outputer for StdoutOutputer {
    fn name(&self) -> &str {
        "stdout"
    }

    fn should_skip(&self, event: &Event) -> bool {
        self.skip.matches(event)
    }

    fn run(&mut self, event: &Event) -> Result<(), PluginError> {
        write_json_line("stdout", &mut self.writer, event)
    }
}
