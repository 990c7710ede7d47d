//! plain 파서

use logrelay_core::error::PluginError;
use logrelay_core::event::{Event, FIELD_TYPE};
use logrelay_core::plugin::{Parser, PluginOptions};

use super::OPTION_TYPE;

/// 원시 메시지를 `{message: raw}` 이벤트로 만드는 파서
///
/// 체인 중간에서는 이벤트를 바꾸지 않고 통과시킵니다 (`type` 옵션 제외).
#[derive(Debug, Clone, Default)]
pub struct PlainParser {
    event_type: Option<String>,
}

impl PlainParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러그인 옵션으로 생성합니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Ok(Self {
            event_type: options.get_str(OPTION_TYPE)?.map(str::to_owned),
        })
    }

    fn tag(&self, mut event: Event) -> Event {
        if let Some(kind) = &self.event_type {
            event.insert(FIELD_TYPE, kind.clone());
        }
        event
    }
}

impl Parser for PlainParser {
    fn name(&self) -> &str {
        "plain"
    }

    fn parse(&self, raw: &str) -> Result<Option<Event>, PluginError> {
        Ok(Some(self.tag(Event::from_message(raw))))
    }

    fn refine(&self, event: Event) -> Result<Option<Event>, PluginError> {
        Ok(Some(self.tag(event)))
    }
}
