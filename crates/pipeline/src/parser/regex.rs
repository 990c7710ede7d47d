//! 정규식 파서
//!
//! `regex` 옵션의 이름 있는 캡처 그룹(`(?P<name>...)`)마다 같은 이름의
//! 문자열 필드를 만듭니다. 매칭되지 않는 메시지는 이벤트를 만들지 않습니다.
//!
//! ```yaml
//! parsers:
//!   - regex:
//!       regex: '^(?P<level>[A-Z]+) (?P<text>.*)$'
//!       keep_message: true
//! ```

use logrelay_core::error::PluginError;
use logrelay_core::event::{Event, FIELD_MESSAGE, FIELD_TYPE};
use logrelay_core::plugin::{Parser, PluginOptions};
use regex::Regex;

use super::OPTION_TYPE;

/// 정규식 옵션 키
pub const OPTION_REGEX: &str = "regex";
/// 원본 메시지 보존 옵션 키
pub const OPTION_KEEP_MESSAGE: &str = "keep_message";

/// 정규식 파서
#[derive(Debug, Clone)]
pub struct RegexParser {
    pattern: Regex,
    keep_message: bool,
    event_type: Option<String>,
}

impl RegexParser {
    /// 플러그인 옵션으로 생성합니다.
    ///
    /// `regex`는 필수이며 컴파일에 실패하면 설정 오류입니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        let source = options.require_str(OPTION_REGEX)?;
        let pattern = Regex::new(source).map_err(|e| PluginError::InvalidOption {
            plugin: options.plugin().to_owned(),
            option: OPTION_REGEX.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            keep_message: options.get_bool(OPTION_KEEP_MESSAGE, false)?,
            event_type: options.get_str(OPTION_TYPE)?.map(str::to_owned),
        })
    }

    /// 컴파일된 정규식
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Parser for RegexParser {
    fn name(&self) -> &str {
        "regex"
    }

    fn parse(&self, raw: &str) -> Result<Option<Event>, PluginError> {
        let Some(captures) = self.pattern.captures(raw) else {
            return Ok(None);
        };

        let mut event = Event::new();
        if self.keep_message {
            event.insert(FIELD_MESSAGE, raw);
        }
        for name in self.pattern.capture_names().flatten() {
            if let Some(value) = captures.name(name) {
                event.insert(name, value.as_str());
            }
        }
        if let Some(kind) = &self.event_type {
            event.insert(FIELD_TYPE, kind.clone());
        }
        Ok(Some(event))
    }
}
