//! 디렉터리 스풀 브로커
//!
//! 큐 하나가 디렉터리 하나이며, 태스크 하나가 파일 하나입니다.
//!
//! ```text
//! <root>/<queue>/
//!   tmp/      발행 중인 파일 (rename 전)
//!   ready/    소비 대기
//!   claimed/  소비자가 가져간 파일 (ack 전)
//!   dead/     dead letter
//! ```
//!
//! 파일 이름은 `{발행시각 ns}-{uuid}.{attempt}.task`입니다. 소비자는
//! `ready/`에서 `claimed/`로 rename하여 태스크를 가져가며, rename은 한
//! 프로세스에서만 성공하므로 같은 디렉터리를 공유하는 여러 프로세스가
//! 안전하게 경쟁 소비할 수 있습니다.
//!
//! ack되지 않은 채 `claim_timeout_secs`보다 오래된 claim은 `consume` 호출
//! 때, 그리고 살아 있는 소비자가 빈 큐를 폴링하는 동안 `claim_timeout_secs`
//! 마다 한 번씩 `ready/`로 되돌아갑니다 (크래시 후 재전달).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use logrelay_core::broker::{BoxFuture, Broker, Consumer, Delivery};
use logrelay_core::error::BrokerError;
use serde_json::{Map, Value};

/// claim 만료 옵션 키
pub const OPTION_CLAIM_TIMEOUT_SECS: &str = "claim_timeout_secs";
/// 빈 큐 폴링 주기 옵션 키
pub const OPTION_POLL_INTERVAL_MS: &str = "poll_interval_ms";

const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const TASK_SUFFIX: &str = ".task";

/// 큐 디렉터리 묶음
#[derive(Debug)]
struct QueueDirs {
    name: String,
    tmp: PathBuf,
    ready: PathBuf,
    claimed: PathBuf,
    dead: PathBuf,
}

impl QueueDirs {
    fn create(root: &Path, name: &str) -> io::Result<Self> {
        let base = root.join(name);
        let dirs = Self {
            name: name.to_owned(),
            tmp: base.join("tmp"),
            ready: base.join("ready"),
            claimed: base.join("claimed"),
            dead: base.join("dead"),
        };
        for dir in [&dirs.tmp, &dirs.ready, &dirs.claimed, &dirs.dead] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(dirs)
    }
}

/// 디렉터리 스풀 브로커
#[derive(Debug, Clone)]
pub struct SpoolBroker {
    root: PathBuf,
    claim_timeout: Duration,
    poll_interval: Duration,
}

impl SpoolBroker {
    /// 스풀 루트를 열고 (없으면 생성) 브로커를 만듭니다.
    ///
    /// `options`는 설정의 `broker_options`입니다.
    pub fn open(root: impl Into<PathBuf>, options: &Map<String, Value>) -> Result<Self, BrokerError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            BrokerError::Connection(format!("cannot create spool {}: {e}", root.display()))
        })?;
        Ok(Self {
            root,
            claim_timeout: duration_option(options, OPTION_CLAIM_TIMEOUT_SECS, Duration::from_secs)?
                .unwrap_or(DEFAULT_CLAIM_TIMEOUT),
            poll_interval: duration_option(options, OPTION_POLL_INTERVAL_MS, Duration::from_millis)?
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }

    /// 스풀 루트 디렉터리
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// claim 만료 시간
    pub fn claim_timeout(&self) -> Duration {
        self.claim_timeout
    }

    /// 소비 대기 중인 태스크 수
    pub fn ready_count(&self, queue: &str) -> usize {
        count_tasks(&self.root.join(queue).join("ready"))
    }

    /// dead letter 파일 수
    pub fn dead_count(&self, queue: &str) -> usize {
        count_tasks(&self.root.join(queue).join("dead"))
    }

    fn dirs(&self, queue: &str) -> Result<QueueDirs, BrokerError> {
        if !is_valid_queue_name(queue) {
            return Err(BrokerError::Connection(format!("invalid queue name '{queue}'")));
        }
        QueueDirs::create(&self.root, queue).map_err(|e| {
            BrokerError::Connection(format!("cannot prepare queue '{queue}': {e}"))
        })
    }
}

impl Broker for SpoolBroker {
    fn name(&self) -> &str {
        "spool"
    }

    fn publish<'a>(&'a self, queue: &'a str, payload: Bytes) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move {
            let dirs = self.dirs(queue)?;
            let name = task_file_name(&new_stem(), 1);
            let tmp = dirs.tmp.join(&name);
            let publish_err = |e: io::Error| BrokerError::Publish {
                queue: queue.to_owned(),
                reason: e.to_string(),
            };
            tokio::fs::write(&tmp, &payload).await.map_err(publish_err)?;
            tokio::fs::rename(&tmp, dirs.ready.join(&name))
                .await
                .map_err(publish_err)?;
            tracing::trace!(queue, file = %name, "task spooled");
            Ok(())
        })
    }

    fn consume<'a>(&'a self, queue: &'a str) -> BoxFuture<'a, Result<Box<dyn Consumer>, BrokerError>> {
        Box::pin(async move {
            let dirs = self.dirs(queue)?;
            sweep_stale_claims(&dirs, self.claim_timeout);
            Ok(Box::new(SpoolConsumer {
                dirs: Arc::new(dirs),
                poll_interval: self.poll_interval,
                claim_timeout: self.claim_timeout,
                last_sweep: Instant::now(),
            }) as Box<dyn Consumer>)
        })
    }
}

/// 스풀 큐 소비자
#[derive(Debug)]
pub struct SpoolConsumer {
    dirs: Arc<QueueDirs>,
    poll_interval: Duration,
    claim_timeout: Duration,
    last_sweep: Instant,
}

impl SpoolConsumer {
    /// 대기 중인 파일 하나를 claim합니다.
    ///
    /// await 지점이 없으므로 claim과 반환 사이에 취소되지 않습니다.
    fn try_claim(&self) -> io::Result<Option<Delivery>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dirs.ready)?
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(TASK_SUFFIX))
            .collect();
        names.sort_unstable();

        for name in names {
            let claimed = self.dirs.claimed.join(&name);
            match std::fs::rename(self.dirs.ready.join(&name), &claimed) {
                Ok(()) => {}
                // 다른 소비자가 먼저 가져감
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
            // claim 시각 기록 (만료 판단 기준)
            std::fs::File::options()
                .write(true)
                .open(&claimed)?
                .set_modified(SystemTime::now())?;
            let payload = std::fs::read(&claimed)?;
            let attempt = parse_task_file_name(&name).map_or(1, |(_, attempt)| attempt);
            return Ok(Some(Delivery {
                queue: self.dirs.name.clone(),
                payload: Bytes::from(payload),
                attempt,
                tag: name,
            }));
        }
        Ok(None)
    }

    fn consume_err(&self, e: io::Error) -> BrokerError {
        BrokerError::Consume {
            queue: self.dirs.name.clone(),
            reason: e.to_string(),
        }
    }
}

impl Consumer for SpoolConsumer {
    fn queue(&self) -> &str {
        &self.dirs.name
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Delivery>, BrokerError>> {
        Box::pin(async move {
            loop {
                if let Some(delivery) = self.try_claim().map_err(|e| self.consume_err(e))? {
                    return Ok(Some(delivery));
                }
                // 큐가 비어 있으면 죽은 소비자의 claim을 회수
                if self.last_sweep.elapsed() >= self.claim_timeout {
                    self.last_sweep = Instant::now();
                    if sweep_stale_claims(&self.dirs, self.claim_timeout) > 0 {
                        continue;
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        })
    }

    fn ack(&mut self, delivery: Delivery) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.dirs.claimed.join(&delivery.tag)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // claim이 만료되어 다른 소비자에게 되돌아간 경우
                    tracing::warn!(queue = %self.dirs.name, tag = %delivery.tag, "ack for expired claim");
                    Ok(())
                }
                Err(e) => Err(self.consume_err(e)),
            }
        })
    }

    fn reject(&mut self, delivery: Delivery, requeue: bool) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            let from = self.dirs.claimed.join(&delivery.tag);
            let to = if requeue {
                let stem = parse_task_file_name(&delivery.tag)
                    .map_or_else(new_stem, |(stem, _)| stem.to_owned());
                self.dirs
                    .ready
                    .join(task_file_name(&stem, delivery.attempt.saturating_add(1)))
            } else {
                self.dirs.dead.join(&delivery.tag)
            };
            tokio::fs::rename(&from, &to)
                .await
                .map_err(|e| self.consume_err(e))
        })
    }
}

// ─── 파일 이름 / 유틸리티 ───────────────────────────────────────────

fn new_stem() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:020}-{}", uuid::Uuid::new_v4().simple())
}

fn task_file_name(stem: &str, attempt: u32) -> String {
    format!("{stem}.{attempt}{TASK_SUFFIX}")
}

/// `{stem}.{attempt}.task` → `(stem, attempt)`
fn parse_task_file_name(name: &str) -> Option<(&str, u32)> {
    let base = name.strip_suffix(TASK_SUFFIX)?;
    let (stem, attempt) = base.rsplit_once('.')?;
    Some((stem, attempt.parse().ok()?))
}

fn is_valid_queue_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn count_tasks(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.file_name().to_string_lossy().ends_with(TASK_SUFFIX))
                .count()
        })
        .unwrap_or(0)
}

fn duration_option(
    options: &Map<String, Value>,
    key: &str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, BrokerError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(|n| Some(unit(n))).ok_or_else(|| {
            BrokerError::Connection(format!(
                "broker option '{key}' must be a non-negative integer"
            ))
        }),
    }
}

/// 만료된 claim을 회수하고 결과를 로그로 남깁니다.
fn sweep_stale_claims(dirs: &QueueDirs, timeout: Duration) -> usize {
    match recover_stale_claims(dirs, timeout) {
        Ok(0) => 0,
        Ok(n) => {
            tracing::warn!(queue = %dirs.name, recovered = n, "stale claims returned to ready");
            n
        }
        Err(e) => {
            tracing::warn!(queue = %dirs.name, error = %e, "stale claim recovery failed");
            0
        }
    }
}

/// 만료된 claim을 attempt를 올려 `ready/`로 되돌립니다.
fn recover_stale_claims(dirs: &QueueDirs, timeout: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut recovered = 0;
    for entry in std::fs::read_dir(&dirs.claimed)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some((stem, attempt)) = parse_task_file_name(&name) else {
            continue;
        };
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age < timeout {
            continue;
        }
        let target = dirs.ready.join(task_file_name(stem, attempt.saturating_add(1)));
        match std::fs::rename(entry.path(), target) {
            Ok(()) => recovered += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn fast(root: &Path) -> SpoolBroker {
        SpoolBroker::open(root, &options(json!({"poll_interval_ms": 5}))).unwrap()
    }

    #[test]
    fn file_name_round_trip() {
        let name = task_file_name("0001-abc", 3);
        assert_eq!(name, "0001-abc.3.task");
        assert_eq!(parse_task_file_name(&name), Some(("0001-abc", 3)));
        assert_eq!(parse_task_file_name("junk"), None);
        assert_eq!(parse_task_file_name("x.y.task"), None);
    }

    #[test]
    fn queue_names_cannot_escape_root() {
        assert!(is_valid_queue_name("parsers"));
        assert!(is_valid_queue_name("out-2"));
        assert!(!is_valid_queue_name(".."));
        assert!(!is_valid_queue_name("a/b"));
        assert!(!is_valid_queue_name(""));
    }

    #[test]
    fn options_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let broker = SpoolBroker::open(
            dir.path(),
            &options(json!({"claim_timeout_secs": 10, "poll_interval_ms": 50})),
        )
        .unwrap();
        assert_eq!(broker.claim_timeout(), Duration::from_secs(10));

        let err = SpoolBroker::open(dir.path(), &options(json!({"claim_timeout_secs": "soon"})))
            .unwrap_err();
        assert!(matches!(err, BrokerError::Connection(_)));
    }

    #[tokio::test]
    async fn publish_consume_ack() {
        let dir = tempfile::tempdir().unwrap();
        let broker = fast(dir.path());
        broker.publish("q", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(broker.ready_count("q"), 1);

        let mut consumer = broker.consume("q").await.unwrap();
        let delivery = consumer.recv().await.unwrap().unwrap();
        assert_eq!(&delivery.payload[..], b"hello");
        assert_eq!(delivery.attempt, 1);
        assert_eq!(broker.ready_count("q"), 0);

        consumer.ack(delivery).await.unwrap();
        assert_eq!(count_tasks(&dir.path().join("q").join("claimed")), 0);
    }

    #[tokio::test]
    async fn requeue_and_dead_letter() {
        let dir = tempfile::tempdir().unwrap();
        let broker = fast(dir.path());
        broker.publish("q", Bytes::from_static(b"x")).await.unwrap();
        let mut consumer = broker.consume("q").await.unwrap();

        let first = consumer.recv().await.unwrap().unwrap();
        consumer.reject(first, true).await.unwrap();
        let second = consumer.recv().await.unwrap().unwrap();
        assert_eq!(second.attempt, 2);

        consumer.reject(second, false).await.unwrap();
        assert_eq!(broker.dead_count("q"), 1);
        assert_eq!(broker.ready_count("q"), 0);
    }

    #[tokio::test]
    async fn empty_queue_waits() {
        let dir = tempfile::tempdir().unwrap();
        let broker = fast(dir.path());
        let mut consumer = broker.consume("q").await.unwrap();
        let result = tokio::time::timeout(Duration::from_millis(50), consumer.recv()).await;
        assert!(result.is_err(), "recv should still be waiting");
    }

    #[tokio::test]
    async fn two_brokers_on_one_spool_share_work() {
        let dir = tempfile::tempdir().unwrap();
        let a = fast(dir.path());
        let b = fast(dir.path());
        for i in 0..10u8 {
            a.publish("q", Bytes::from(vec![i])).await.unwrap();
        }

        let mut ca = a.consume("q").await.unwrap();
        let mut cb = b.consume("q").await.unwrap();
        let mut seen = Vec::new();
        for turn in 0..10 {
            let consumer = if turn % 2 == 0 { &mut ca } else { &mut cb };
            let delivery = consumer.recv().await.unwrap().unwrap();
            seen.push(delivery.payload[0]);
            consumer.ack(delivery).await.unwrap();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn stale_claims_are_redelivered() {
        let dir = tempfile::tempdir().unwrap();
        let broker = SpoolBroker::open(
            dir.path(),
            &options(json!({"claim_timeout_secs": 0, "poll_interval_ms": 5})),
        )
        .unwrap();
        broker.publish("q", Bytes::from_static(b"crash")).await.unwrap();

        // 첫 소비자는 ack 없이 사라짐
        let mut crashed = broker.consume("q").await.unwrap();
        let lost = crashed.recv().await.unwrap().unwrap();
        drop(crashed);
        assert_eq!(broker.ready_count("q"), 0);

        let mut consumer = broker.consume("q").await.unwrap();
        let again = consumer.recv().await.unwrap().unwrap();
        assert_eq!(again.payload, lost.payload);
        assert_eq!(again.attempt, 2);
    }

    #[tokio::test]
    async fn polling_consumer_recovers_claims_of_dead_peer() {
        let dir = tempfile::tempdir().unwrap();
        let broker = SpoolBroker::open(
            dir.path(),
            &options(json!({"claim_timeout_secs": 0, "poll_interval_ms": 5})),
        )
        .unwrap();

        // 살아 있는 소비자는 태스크 발행 전에 이미 폴링 중
        let mut survivor = broker.consume("q").await.unwrap();
        broker.publish("q", Bytes::from_static(b"orphan")).await.unwrap();

        let mut crashed = broker.consume("q").await.unwrap();
        let lost = crashed.recv().await.unwrap().unwrap();
        drop(crashed);
        assert_eq!(count_tasks(&dir.path().join("q").join("claimed")), 1);

        let again = tokio::time::timeout(Duration::from_secs(5), survivor.recv())
            .await
            .expect("idle consumer should recover the stale claim")
            .unwrap()
            .unwrap();
        assert_eq!(again.payload, lost.payload);
        assert_eq!(again.attempt, 2);
    }

    #[tokio::test]
    async fn fresh_claims_are_left_alone_while_polling() {
        let dir = tempfile::tempdir().unwrap();
        let broker = fast(dir.path());
        broker.publish("q", Bytes::from_static(b"busy")).await.unwrap();

        let mut holder = broker.consume("q").await.unwrap();
        let _held = holder.recv().await.unwrap().unwrap();

        let mut other = broker.consume("q").await.unwrap();
        let result = tokio::time::timeout(Duration::from_millis(50), other.recv()).await;
        assert!(result.is_err(), "claim within timeout must not be redelivered");
        assert_eq!(count_tasks(&dir.path().join("q").join("claimed")), 1);
    }
}
