//! 기본 제공 아웃푸터 플러그인
//!
//! `stdout`과 `file`은 이벤트를 한 줄짜리 JSON으로, `plain`은 `message`
//! 필드 원문을 한 줄로 기록합니다. 모든 아웃푸터가 `skip_types` 옵션(문자열
//! 또는 목록)을 지원합니다.

pub mod file;
pub mod plain;
pub mod stdout;

use std::io::Write;

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;

/// 이벤트를 JSON 라인으로 쓰고 flush합니다.
pub(crate) fn write_json_line<W: Write + ?Sized>(
    plugin: &str,
    writer: &mut W,
    event: &Event,
) -> Result<(), PluginError> {
    write_line(plugin, writer, event.to_json_line())
}

/// 개행을 붙인 한 줄을 `write_all` 한 번으로 쓰고 flush합니다.
///
/// 여러 워커가 같은 대상에 쓰더라도 줄 중간에 다른 줄이 끼어들지 않습니다.
pub(crate) fn write_line<W: Write + ?Sized>(
    plugin: &str,
    writer: &mut W,
    mut line: String,
) -> Result<(), PluginError> {
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .map_err(|e| PluginError::transform(plugin, e))?;
    writer.flush().map_err(|e| PluginError::transform(plugin, e))
}
