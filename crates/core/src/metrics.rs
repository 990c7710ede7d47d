//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 등의 매크로를 호출합니다.
//! 레코더가 설치되지 않은 프로세스(테스트 등)에서는 기록이 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logrelay_`
//! - 스테이지명: `parser_`, `output_`, `input_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 큐 이름 레이블 키
pub const LABEL_QUEUE: &str = "queue";

/// 플러그인 이름 레이블 키
pub const LABEL_PLUGIN: &str = "plugin";

/// 실패 처리 결과 레이블 키 (requeued, dead_lettered)
pub const LABEL_RESULT: &str = "result";

// ─── 워커 풀 메트릭 ────────────────────────────────────────────────

/// 큐에서 꺼낸 태스크 수 (counter, label: queue)
pub const WORKER_TASKS_CONSUMED_TOTAL: &str = "logrelay_worker_tasks_consumed_total";

/// 실패한 태스크 수 (counter, labels: queue, result)
pub const WORKER_TASK_FAILURES_TOTAL: &str = "logrelay_worker_task_failures_total";

/// 태스크 처리 시간 (histogram, 초, label: queue)
pub const WORKER_TASK_DURATION_SECONDS: &str = "logrelay_worker_task_duration_seconds";

// ─── 파서 스테이지 메트릭 ──────────────────────────────────────────

/// 출력 큐로 발행된 이벤트 수 (counter)
pub const PARSER_EVENTS_PUBLISHED_TOTAL: &str = "logrelay_parser_events_published_total";

/// 파서 체인이 이벤트를 만들지 않아 버려진 메시지 수 (counter)
pub const PARSER_MESSAGES_DROPPED_TOTAL: &str = "logrelay_parser_messages_dropped_total";

// ─── 출력 스테이지 메트릭 ──────────────────────────────────────────

/// 아웃푸터 전달 성공 수 (counter, label: plugin)
pub const OUTPUT_DELIVERED_TOTAL: &str = "logrelay_output_delivered_total";

/// skip 필터로 건너뛴 수 (counter, label: plugin)
pub const OUTPUT_SKIPPED_TOTAL: &str = "logrelay_output_skipped_total";

/// 아웃푸터 실패 수 (counter, label: plugin)
pub const OUTPUT_FAILURES_TOTAL: &str = "logrelay_output_failures_total";

// ─── 입력 메트릭 ───────────────────────────────────────────────────

/// 입력에서 수집해 발행한 라인 수 (counter, label: plugin)
pub const INPUT_LINES_COLLECTED_TOTAL: &str = "logrelay_input_lines_collected_total";

/// 태스크 처리 시간 히스토그램 버킷 (초)
pub const TASK_DURATION_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

/// 모든 메트릭 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        WORKER_TASKS_CONSUMED_TOTAL,
        "Tasks taken from a queue by a worker"
    );
    describe_counter!(
        WORKER_TASK_FAILURES_TOTAL,
        "Tasks rejected by a worker, by outcome"
    );
    describe_histogram!(
        WORKER_TASK_DURATION_SECONDS,
        "Time spent handling one task"
    );
    describe_counter!(
        PARSER_EVENTS_PUBLISHED_TOTAL,
        "Events published to the output queue"
    );
    describe_counter!(
        PARSER_MESSAGES_DROPPED_TOTAL,
        "Messages for which the parser chain produced no event"
    );
    describe_counter!(OUTPUT_DELIVERED_TOTAL, "Events written by an outputer");
    describe_counter!(
        OUTPUT_SKIPPED_TOTAL,
        "Events suppressed by an outputer skip filter"
    );
    describe_counter!(OUTPUT_FAILURES_TOTAL, "Outputer errors");
    describe_counter!(
        INPUT_LINES_COLLECTED_TOTAL,
        "Raw lines collected by inputs and published"
    );
}
