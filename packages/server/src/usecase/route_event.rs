//! UseCase: イベント中継処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RouteEventUseCase::execute() メソッド
//! - ロールによる送信可否判定、配信先ルームの計算、サーバータイムスタンプの付与
//!
//! ### どのような状況を想定しているか
//! - 正常系：各イベント種別のファンアウト
//! - 異常系：許可されていないロールからの送信、不正なフレーム
//! - エッジケース：配信途中で切断された接続

use std::sync::Arc;

use convoy_shared::{ClientFrame, RelayedEvent};

use crate::{
    domain::{Connection, ConnectionRegistry, DeliveryReport, FanoutPolicy, Timestamp},
    infrastructure::dto::websocket::encode_event,
};

use super::error::RouteError;

/// Result of routing one event.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// The stamped copy handed to recipients
    pub event: RelayedEvent,
    pub report: DeliveryReport,
}

/// イベント中継のユースケース
pub struct RouteEventUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl RouteEventUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Parse a raw text frame as `{type, payload}`.
    pub fn parse(text: &str) -> Result<ClientFrame, RouteError> {
        serde_json::from_str::<ClientFrame>(text).map_err(|e| RouteError::MalformedFrame(e.to_string()))
    }

    /// Route an event emitted by `origin`.
    ///
    /// Permission and targets are computed from the origin's authenticated
    /// role. Membership is read from live connections at call time.
    pub async fn execute(
        &self,
        origin: &Connection,
        frame: ClientFrame,
    ) -> Result<RouteOutcome, RouteError> {
        let plan = FanoutPolicy::plan(origin.role(), frame.r#type, &frame.payload)?;

        let event = RelayedEvent {
            r#type: frame.r#type,
            payload: frame.payload,
            timestamp: Timestamp::now().value(),
            sender: origin.sender_info(),
        };
        let encoded = encode_event(&event).map_err(|e| RouteError::Encode(e.to_string()))?;

        let exclude = plan.exclude_origin.then_some(&origin.id);
        let report = self.registry.deliver(&plan.rooms, exclude, &encoded).await;

        tracing::debug!(
            "Routed '{}' from '{}' ({}) to {} connection(s), {} dropped",
            event.r#type,
            origin.id,
            origin.role(),
            report.delivered_count(),
            report.dropped.len()
        );

        Ok(RouteOutcome { event, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionId, ConnectionIdFactory, Identity, RoutingPolicyError, UserId,
        },
        infrastructure::repository::InMemoryConnectionRegistry,
    };
    use convoy_shared::{EventType, Role, ServerFrame};
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    struct Peer {
        connection: Connection,
        rx: mpsc::Receiver<String>,
    }

    impl Peer {
        fn try_event(&mut self) -> Option<RelayedEvent> {
            let text = self.rx.try_recv().ok()?;
            match serde_json::from_str::<ServerFrame>(&text).unwrap() {
                ServerFrame::Event(event) => Some(event),
                ServerFrame::Control(_) => None,
            }
        }
    }

    async fn join(registry: &Arc<InMemoryConnectionRegistry>, user_id: &str, role: Role) -> Peer {
        let connection = Connection::new(
            ConnectionIdFactory::generate(),
            Identity::new(UserId::new(user_id.to_string()).unwrap(), role),
            Timestamp::new(0),
        );
        let (tx, rx) = mpsc::channel(16);
        registry.register(connection.clone(), tx).await.unwrap();
        Peer { connection, rx }
    }

    fn frame(event_type: EventType, payload: serde_json::Value) -> ClientFrame {
        ClientFrame {
            r#type: event_type,
            payload,
        }
    }

    fn ids(report: &DeliveryReport) -> HashSet<ConnectionId> {
        report.delivered.iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_check_in_reaches_endusers_and_operators_not_sender() {
        // テスト項目: STAFF の check_in は ENDUSER / OPERATOR に届き、送信者自身には戻らない
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let mut staff = join(&registry, "driver-7", Role::Staff).await;
        let mut other_staff = join(&registry, "driver-8", Role::Staff).await;
        let mut rider = join(&registry, "parent-1", Role::Enduser).await;
        let mut operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());
        let payload = json!({"studentId": 42, "tripId": 7});

        // when (操作):
        let before = Timestamp::now().value();
        let outcome = usecase
            .execute(&staff.connection, frame(EventType::CheckIn, payload.clone()))
            .await
            .unwrap();

        // then (期待する結果):
        for peer in [&mut rider, &mut operator] {
            let event = peer.try_event().expect("event delivered");
            assert_eq!(event.r#type, EventType::CheckIn);
            assert_eq!(event.payload, payload);
            assert!(event.timestamp >= before);
            assert_eq!(event.sender.user_id, "driver-7");
            assert_eq!(event.sender.role, Role::Staff);
        }
        assert!(staff.try_event().is_none());
        assert!(other_staff.try_event().is_none());
        assert_eq!(outcome.report.delivered_count(), 2);
    }

    #[tokio::test]
    async fn test_location_update_reaches_every_enduser_and_operator() {
        // テスト項目: location_update はすべての ENDUSER / OPERATOR に届き、STAFF には届かない
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let staff = join(&registry, "driver-7", Role::Staff).await;
        let other_staff = join(&registry, "driver-8", Role::Staff).await;
        let riders = [
            join(&registry, "parent-1", Role::Enduser).await,
            join(&registry, "parent-2", Role::Enduser).await,
        ];
        let operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        // when (操作):
        let outcome = usecase
            .execute(
                &staff.connection,
                frame(EventType::LocationUpdate, json!({"lat": 35.6, "lng": 139.7})),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let expected: HashSet<ConnectionId> = riders
            .iter()
            .map(|p| p.connection.id.clone())
            .chain([operator.connection.id.clone()])
            .collect();
        assert_eq!(ids(&outcome.report), expected);
        assert!(!ids(&outcome.report).contains(&other_staff.connection.id));
        assert!(!ids(&outcome.report).contains(&staff.connection.id));
    }

    #[tokio::test]
    async fn test_location_update_from_enduser_is_rejected_and_not_broadcast() {
        // テスト項目: 許可されていないロールからのイベントは破棄され、誰にも配信されない
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let rider = join(&registry, "parent-1", Role::Enduser).await;
        let mut operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        let result = usecase
            .execute(
                &rider.connection,
                frame(EventType::LocationUpdate, json!({"lat": 0, "lng": 0})),
            )
            .await;

        assert_eq!(
            result.unwrap_err(),
            RouteError::Policy(RoutingPolicyError::NotPermitted {
                event_type: EventType::LocationUpdate,
                role: Role::Enduser,
            })
        );
        assert!(operator.try_event().is_none());
    }

    #[tokio::test]
    async fn test_emergency_alert_with_and_without_trip() {
        // テスト項目: tripId なしは OPERATOR のみ、tripId ありは ENDUSER にも届く
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let rider = join(&registry, "parent-1", Role::Enduser).await;
        let staff = join(&registry, "driver-7", Role::Staff).await;
        let operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        // when (操作):
        let without_trip = usecase
            .execute(
                &rider.connection,
                frame(EventType::EmergencyAlert, json!({"reason": "lost"})),
            )
            .await
            .unwrap();
        let with_trip = usecase
            .execute(
                &staff.connection,
                frame(EventType::EmergencyAlert, json!({"tripId": 7})),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            ids(&without_trip.report),
            HashSet::from([operator.connection.id.clone()])
        );
        assert_eq!(
            ids(&with_trip.report),
            HashSet::from([operator.connection.id.clone(), rider.connection.id.clone()])
        );
    }

    #[tokio::test]
    async fn test_chat_message_uses_authenticated_sender() {
        // テスト項目: chat_message の送信者情報は認証済みの ID から付与され、payload の偽装は無視される
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let rider = join(&registry, "parent-1", Role::Enduser).await;
        let mut driver = join(&registry, "driver-7", Role::Staff).await;
        let mut operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        // when (操作):
        usecase
            .execute(
                &rider.connection,
                frame(
                    EventType::ChatMessage,
                    json!({"recipientId": "driver-7", "text": "late?", "role": "OPERATOR"}),
                ),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let received = driver.try_event().unwrap();
        assert_eq!(received.sender.user_id, "parent-1");
        assert_eq!(received.sender.role, Role::Enduser);
        assert!(operator.try_event().is_some());
    }

    #[tokio::test]
    async fn test_operator_to_operator_chat_has_no_audit_copy() {
        // テスト項目: OPERATOR 同士の chat_message は受信者にのみ届く
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let op1 = join(&registry, "op-1", Role::Operator).await;
        let op2 = join(&registry, "op-2", Role::Operator).await;
        let mut op3 = join(&registry, "op-3", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        let outcome = usecase
            .execute(
                &op1.connection,
                frame(EventType::ChatMessage, json!({"recipientId": "op-2"})),
            )
            .await
            .unwrap();

        assert_eq!(
            ids(&outcome.report),
            HashSet::from([op2.connection.id.clone()])
        );
        assert!(op3.try_event().is_none());
    }

    #[tokio::test]
    async fn test_trip_status_reaches_all_connections() {
        // テスト項目: trip_status は送信者を含むすべての接続に届く
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let staff = join(&registry, "driver-7", Role::Staff).await;
        let rider = join(&registry, "parent-1", Role::Enduser).await;
        let operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        let outcome = usecase
            .execute(
                &operator.connection,
                frame(EventType::TripStatus, json!({"tripId": 7, "status": "departed"})),
            )
            .await
            .unwrap();

        assert_eq!(
            ids(&outcome.report),
            HashSet::from([
                staff.connection.id.clone(),
                rider.connection.id.clone(),
                operator.connection.id.clone(),
            ])
        );
    }

    #[tokio::test]
    async fn test_typing_reaches_recipient_only() {
        // テスト項目: typing は受信者にのみ届き、OPERATOR には届かない
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let rider = join(&registry, "parent-1", Role::Enduser).await;
        let driver = join(&registry, "driver-7", Role::Staff).await;
        let _operator = join(&registry, "op-1", Role::Operator).await;
        let usecase = RouteEventUseCase::new(registry.clone());

        let outcome = usecase
            .execute(
                &rider.connection,
                frame(EventType::Typing, json!({"recipientId": "driver-7"})),
            )
            .await
            .unwrap();

        assert_eq!(
            ids(&outcome.report),
            HashSet::from([driver.connection.id.clone()])
        );
    }

    #[tokio::test]
    async fn test_disconnected_peer_never_receives_event() {
        // テスト項目: 配信前に切断された接続にはイベントが届かず、エラーにもならない
        // given (前提条件):
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let staff = join(&registry, "driver-7", Role::Staff).await;
        let mut rider = join(&registry, "parent-1", Role::Enduser).await;
        let usecase = RouteEventUseCase::new(registry.clone());
        registry.unregister(&rider.connection.id).await.unwrap();

        // when (操作):
        let outcome = usecase
            .execute(
                &staff.connection,
                frame(EventType::CheckOut, json!({"studentId": 42})),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.report.delivered.is_empty());
        assert!(rider.try_event().is_none());
    }

    #[test]
    fn test_parse_malformed_frame() {
        // テスト項目: {type, payload} として解釈できないフレームは MalformedFrame になる
        for text in ["not json", r#"{"type":"check_in"}"#, r#"{"type":"dance","payload":{}}"#] {
            assert!(matches!(
                RouteEventUseCase::parse(text),
                Err(RouteError::MalformedFrame(_))
            ));
        }
    }
}
