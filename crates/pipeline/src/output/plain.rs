//! 원문 아웃푸터
//!
//! 이벤트의 `message` 필드를 가공 없이 한 줄로 씁니다. `message`가 없는
//! 이벤트는 compact JSON 한 줄로 대신 기록합니다.

use std::fmt;
use std::io::{self, Write};

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::plugin::{Outputer, PluginOptions, SkipFilter};

use super::write_line;

/// `message` 원문 아웃푸터
pub struct PlainOutputer {
    skip: SkipFilter,
    writer: Box<dyn Write + Send>,
}

impl PlainOutputer {
    /// 플러그인 옵션으로 생성합니다. 대상은 표준 출력입니다.
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

impl fmt::Debug for PlainOutputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainOutputer")
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

impl Outputer for PlainOutputer {
    fn name(&self) -> &str {
        "plain"
    }

    fn should_skip(&self, event: &Event) -> bool {
        self.skip.matches(event)
    }

    fn run(&mut self, event: &Event) -> Result<(), PluginError> {
        let line = match event.message() {
            Some(message) => message.to_owned(),
            None => event.to_json_line(),
        };
        write_line("plain", &mut self.writer, line)
    }
}
