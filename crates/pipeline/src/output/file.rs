//! 파일 아웃푸터
//!
//! `path` 옵션의 파일 끝에 이벤트를 JSON 라인으로 덧붙입니다.
//! 파일은 생성 시점에 열어 두므로, 열 수 없는 경로는 워커 시작 단계에서
//! 설정 오류로 드러납니다.
//!
//! 같은 파일을 가리키는 아웃푸터(워커마다 하나)는 프로세스 안에서 경로별
//! 잠금을 공유하며, 각 줄은 잠금을 쥔 채 한 번에 기록됩니다.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use logrelay_core::error::PluginError;
use logrelay_core::event::Event;
use logrelay_core::plugin::{Outputer, PluginOptions, SkipFilter};

use super::write_json_line;

/// 대상 경로 옵션 키
pub const OPTION_PATH: &str = "path";

/// 파일 아웃푸터
#[derive(Debug)]
pub struct FileOutputer {
    path: PathBuf,
    skip: SkipFilter,
    file: File,
    lock: Arc<Mutex<()>>,
}

impl FileOutputer {
    /// 플러그인 옵션으로 생성합니다.
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        let path = PathBuf::from(options.require_str(OPTION_PATH)?);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PluginError::InvalidOption {
                plugin: options.plugin().to_owned(),
                option: OPTION_PATH.to_owned(),
                reason: format!("cannot open {}: {e}", path.display()),
            })?;
        Ok(Self {
            lock: path_lock(&path),
            path,
            skip: SkipFilter::from_options(options)?,
            file,
        })
    }

    /// 대상 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Outputer for FileOutputer {
    fn name(&self) -> &str {
        "file"
    }

    fn should_skip(&self, event: &Event) -> bool {
        self.skip.matches(event)
    }

    fn run(&mut self, event: &Event) -> Result<(), PluginError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_json_line("file", &mut self.file, event)
    }
}

/// 경로별 쓰기 잠금
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    // 파일은 이미 열려 있으므로 보통 canonicalize가 성공
    let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}
