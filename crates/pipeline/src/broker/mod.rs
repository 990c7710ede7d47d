//! 브로커 구현체와 URL 기반 연결
//!
//! - `memory://`: 프로세스 내부 채널 ([`MemoryBroker`]). 테스트와 단일 프로세스 실행용.
//! - `spool://<디렉터리>`: 디렉터리 스풀 ([`SpoolBroker`]). 같은 파일시스템을
//!   공유하는 여러 프로세스가 경쟁 소비할 수 있습니다.
//!
//! 그 밖의 스킴은 [`BrokerError::UnsupportedScheme`]으로 시작 단계에서 실패합니다.

pub mod memory;
pub mod spool;

use std::sync::Arc;

use logrelay_core::broker::Broker;
use logrelay_core::error::BrokerError;
use serde_json::{Map, Value};

pub use memory::MemoryBroker;
pub use spool::SpoolBroker;

/// 인메모리 브로커 스킴
pub const MEMORY_SCHEME: &str = "memory://";
/// 디렉터리 스풀 브로커 스킴
pub const SPOOL_SCHEME: &str = "spool://";

/// `broker_url`의 스킴에 맞는 브로커를 생성합니다.
pub fn connect(url: &str, options: &Map<String, Value>) -> Result<Arc<dyn Broker>, BrokerError> {
    if url.strip_prefix(MEMORY_SCHEME).is_some() {
        tracing::warn!(url, "memory broker is process-local; stages in other processes will not see its queues");
        return Ok(Arc::new(MemoryBroker::new()));
    }
    if let Some(path) = url.strip_prefix(SPOOL_SCHEME) {
        if path.is_empty() {
            return Err(BrokerError::Connection(format!(
                "spool url '{url}' has no directory"
            )));
        }
        let broker = SpoolBroker::open(path, options)?;
        tracing::info!(root = %broker.root().display(), "spool broker opened");
        return Ok(Arc::new(broker));
    }
    Err(BrokerError::UnsupportedScheme {
        url: url.to_owned(),
    })
}
