//! 브로커 추상화 — 스테이지 간 큐 전송 계약
//!
//! 디스패치 엔진은 [`Broker`] trait만 알며, 실제 전송(AMQP, 파일 스풀,
//! 인메모리 등)은 구현체가 담당합니다.
//!
//! # 전달 보장
//! - at-least-once: 확인(ack)되지 않은 태스크는 다시 전달될 수 있습니다.
//! - competing consumers: 하나의 전달은 동시에 하나의 소비자에게만 보입니다.
//! - 순서 보장 없음: 여러 소비자 사이에서 FIFO를 가정하지 않습니다.
//!
//! 중복 전달은 내부에서 걸러내지 않습니다. 플러그인 쪽에서 재전달을
//! 견딜 수 있어야 합니다.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::BrokerError;

/// dyn-compatible trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 소비자가 받은 단일 전달
#[derive(Debug, Clone)]
pub struct Delivery {
    /// 전달된 큐 이름
    pub queue: String,
    /// 태스크 페이로드
    pub payload: Bytes,
    /// 전달 시도 횟수 (첫 전달은 1)
    pub attempt: u32,
    /// 브로커 내부 식별자 (ack/reject에 사용)
    pub tag: String,
}

impl Delivery {
    /// 재전달된 메시지인지 확인합니다.
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// 메시지 브로커
///
/// `Arc<dyn Broker>`로 여러 워커가 공유합니다.
pub trait Broker: Send + Sync {
    /// 브로커 식별용 이름 (로그용)
    fn name(&self) -> &str;

    /// 큐에 페이로드를 발행합니다.
    fn publish<'a>(&'a self, queue: &'a str, payload: Bytes)
    -> BoxFuture<'a, Result<(), BrokerError>>;

    /// 큐에 대한 소비자를 생성합니다.
    fn consume<'a>(&'a self, queue: &'a str)
    -> BoxFuture<'a, Result<Box<dyn Consumer>, BrokerError>>;
}

/// 큐 소비자
///
/// `recv`는 취소 안전해야 합니다. 워커는 종료 신호와 함께
/// `tokio::select!`로 대기합니다.
pub trait Consumer: Send {
    /// 소비 중인 큐 이름
    fn queue(&self) -> &str;

    /// 다음 전달을 기다립니다. 큐가 닫히면 `None`.
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Delivery>, BrokerError>>;

    /// 처리 완료를 확인합니다.
    fn ack(&mut self, delivery: Delivery) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// 처리 실패를 알립니다. `requeue`가 false면 dead letter로 보냅니다.
    fn reject(&mut self, delivery: Delivery, requeue: bool)
    -> BoxFuture<'_, Result<(), BrokerError>>;
}
