//! 기본 제공 파서 플러그인
//!
//! - [`plain::PlainParser`]: 원시 메시지를 그대로 `message` 필드에 담습니다.
//! - [`regex::RegexParser`]: 이름 있는 캡처 그룹을 필드로 추출합니다.
//!
//! 두 파서 모두 `type` 옵션을 주면 만들어진 이벤트에 `type` 필드를 붙입니다.

pub mod plain;
pub mod regex;

/// 이벤트 유형 옵션 키
pub const OPTION_TYPE: &str = "type";
