//! 파일 입력 수집기
//!
//! 로그 파일을 폴링하며 마지막 위치 이후에 추가된 완전한 라인을 수집합니다.
//! `tail -f`와 비슷하게 동작합니다.
//!
//! # 로테이션 감지
//! - inode 변경 감지 (logrotate 등, Unix 전용)
//! - 파일 크기 축소 감지 (truncation)
//! - 파일이 사라졌다가 다시 생기면 처음부터 읽기

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use logrelay_core::error::PluginError;
use logrelay_core::plugin::{Input, PluginOptions};

/// 대상 경로 옵션 키
pub const OPTION_PATH: &str = "path";
/// 처음부터 읽기 옵션 키
pub const OPTION_FROM_START: &str = "from_start";
/// 최대 라인 길이 옵션 키
pub const OPTION_MAX_LINE_LENGTH: &str = "max_line_length";

/// 기본 최대 라인 길이 (64KB)
const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// 파일 추적 상태
#[derive(Debug, Default)]
struct FileState {
    /// 마지막으로 읽은 완전한 라인 끝의 바이트 오프셋
    offset: u64,
    /// 현재 파일의 inode (Unix 전용)
    inode: Option<u64>,
    /// 첫 폴링을 마쳤는지 여부
    primed: bool,
}

/// 파일 입력
#[derive(Debug)]
pub struct FileInput {
    path: PathBuf,
    from_start: bool,
    max_line_length: usize,
    state: FileState,
}

impl FileInput {
    /// 플러그인 옵션으로 생성합니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        let path = PathBuf::from(options.require_str(OPTION_PATH)?);
        let max_line_length = match options.get(OPTION_MAX_LINE_LENGTH) {
            None => DEFAULT_MAX_LINE_LENGTH,
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| PluginError::InvalidOption {
                    plugin: options.plugin().to_owned(),
                    option: OPTION_MAX_LINE_LENGTH.to_owned(),
                    reason: "expected a positive integer".to_owned(),
                })?,
        };
        Ok(Self {
            path,
            from_start: options.get_bool(OPTION_FROM_START, false)?,
            max_line_length,
            state: FileState::default(),
        })
    }

    /// 감시 중인 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 읽기 오프셋
    pub fn offset(&self) -> u64 {
        self.state.offset
    }

    fn read_new_lines(&mut self, file: File, len: u64) -> std::io::Result<Vec<String>> {
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.state.offset))?;

        let mut lines = Vec::new();
        let mut consumed = self.state.offset;
        let mut buf = Vec::new();
        while consumed < len {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 || buf.last() != Some(&b'\n') {
                // 아직 개행이 오지 않은 마지막 라인은 다음 폴링에서 읽음
                break;
            }
            consumed += n as u64;

            let line = trim_newline(&buf);
            if line.is_empty() {
                continue;
            }
            if line.len() > self.max_line_length {
                tracing::warn!(
                    path = %self.path.display(),
                    length = line.len(),
                    max = self.max_line_length,
                    "line too long, truncating"
                );
            }
            let end = line.len().min(self.max_line_length);
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        self.state.offset = consumed;
        Ok(lines)
    }
}

fn trim_newline(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &buf[..end]
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

impl Input for FileInput {
    fn name(&self) -> &str {
        "file"
    }

    fn poll(&mut self) -> Result<Vec<String>, PluginError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.state.primed {
                    tracing::debug!(path = %self.path.display(), "file missing, waiting");
                }
                // 다시 생기는 파일은 새 파일이므로 처음부터 읽음
                self.state = FileState {
                    primed: true,
                    ..FileState::default()
                };
                return Ok(Vec::new());
            }
            Err(e) => return Err(PluginError::transform("file", e)),
        };
        let metadata = file.metadata().map_err(|e| PluginError::transform("file", e))?;
        let len = metadata.len();
        let inode = inode_of(&metadata);

        if !self.state.primed {
            self.state.primed = true;
            self.state.inode = inode;
            if !self.from_start {
                self.state.offset = len;
                return Ok(Vec::new());
            }
        }

        if inode != self.state.inode {
            tracing::info!(path = %self.path.display(), "file rotated, reading from start");
            self.state.inode = inode;
            self.state.offset = 0;
        } else if len < self.state.offset {
            tracing::info!(path = %self.path.display(), "file truncated, reading from start");
            self.state.offset = 0;
        }

        self.read_new_lines(file, len)
            .map_err(|e| PluginError::transform("file", e))
    }
}
