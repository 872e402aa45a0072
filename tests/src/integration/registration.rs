//! # Registration Scenarios
//!
//! Per-(topic, method) ownership on one server instance, bulk registration
//! with rollback, and what deregistration does to delivery.

#[cfg(test)]
mod tests {
    use super::super::support::{room, FixedIdService, Harness, SCENARIO_TIMEOUT};
    use agent_dispatch::{
        AgentDispatch, AgentDispatchInternalServer, RoomName, SERVICE_NAME,
    };
    use bytes::Bytes;
    use rpc_core::{RequestOptions, RpcError};
    use shared_bus::MessageBus;
    use shared_types::{encode, request_channel, unix_millis, RequestEnvelope, RequestId};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tokio::time::{sleep, timeout};

    const METHODS: [&str; 3] = ["CreateDispatch", "DeleteDispatch", "ListDispatch"];

    fn registered(server: &AgentDispatchInternalServer<RoomName>, topic: &str) -> Vec<bool> {
        METHODS
            .iter()
            .map(|m| server.inner().is_registered(m, topic))
            .collect()
    }

    #[tokio::test]
    async fn test_second_registration_conflicts_and_first_keeps_serving() {
        let service = FixedIdService::new("d-first");
        let h = Harness::new(service.clone());
        let r1 = room("room-1");

        h.server.register_create_dispatch_topic(&r1).unwrap();
        let err = h.server.register_create_dispatch_topic(&r1).unwrap_err();
        assert!(matches!(err, RpcError::RegistrationConflict { .. }));

        let created = timeout(
            SCENARIO_TIMEOUT,
            h.client.create_dispatch(
                &r1,
                &AgentDispatch::new("greeter", "room-1"),
                RequestOptions::default(),
            ),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(created.id, "d-first");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_bulk_registration_rolls_back_on_failure() {
        let h = Harness::in_memory();
        let r1 = room("room-1");

        // ListDispatch is the last method registered; make it fail.
        h.server.register_list_dispatch_topic(&r1).unwrap();

        let err = h.server.register_all_room_topics(&r1).unwrap_err();
        assert!(matches!(err, RpcError::RegistrationConflict { .. }));
        assert_eq!(registered(&h.server, "room-1"), [false, false, true]);

        // Nothing subscribed for the rolled-back methods.
        for method in ["CreateDispatch", "DeleteDispatch"] {
            let channel = request_channel(SERVICE_NAME, method, "room-1");
            assert_eq!(h.bus.subscriber_count(&channel), 0);
        }
    }

    #[tokio::test]
    async fn test_bulk_registration_is_per_room() {
        let h = Harness::in_memory();
        h.server.register_all_room_topics(&room("room-1")).unwrap();
        h.server.register_all_room_topics(&room("room-2")).unwrap();

        assert_eq!(h.server.inner().registration_count(), 6);

        h.server.deregister_all_room_topics(&room("room-1"));
        assert_eq!(registered(&h.server, "room-1"), [false, false, false]);
        assert_eq!(registered(&h.server, "room-2"), [true, true, true]);
    }

    #[tokio::test]
    async fn test_deregistration_stops_delivery() {
        let service = FixedIdService::new("d-1");
        let h = Harness::with_client_timeout(service.clone(), Duration::from_millis(200));
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        h.client
            .create_dispatch(
                &r1,
                &AgentDispatch::new("greeter", "room-1"),
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(service.calls(), 1);

        h.server.deregister_all_room_topics(&r1);

        let channel = request_channel(SERVICE_NAME, "CreateDispatch", "room-1");
        assert_eq!(h.bus.subscriber_count(&channel), 0);

        let err = h
            .client
            .create_dispatch(
                &r1,
                &AgentDispatch::new("greeter", "room-1"),
                RequestOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // A raw publish reaches nobody and invokes nothing.
        let now = unix_millis(SystemTime::now());
        let envelope = RequestEnvelope {
            request_id: RequestId::new(),
            client_id: "CLI_raw".into(),
            method: "CreateDispatch".into(),
            topic: "room-1".into(),
            payload: encode(&AgentDispatch::new("greeter", "room-1")).unwrap(),
            deadline_unix_ms: Some(now + 5_000),
            sent_at_unix_ms: now,
        };
        let reached = h
            .bus
            .publish(&channel, Bytes::from(encode(&envelope).unwrap()))
            .await
            .unwrap();
        assert_eq!(reached, 0);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_two_servers_on_one_topic_first_response_wins() {
        // Misconfigured deployment: two instances own the same room.
        let first = FixedIdService::new("d-a");
        let second = FixedIdService::new("d-b");
        let h = Harness::new(first.clone());
        let other = AgentDispatchInternalServer::<RoomName>::new(second.clone(), h.bus.clone());

        let r1 = room("room-1");
        h.server.register_create_dispatch_topic(&r1).unwrap();
        other.register_create_dispatch_topic(&r1).unwrap();

        let created = timeout(
            SCENARIO_TIMEOUT,
            h.client.create_dispatch(
                &r1,
                &AgentDispatch::new("greeter", "room-1"),
                RequestOptions::default(),
            ),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(created.id == "d-a" || created.id == "d-b");

        // Both ran; exactly one answer was delivered, the other discarded.
        timeout(SCENARIO_TIMEOUT, async {
            while first.calls() + second.calls() < 2
                || h.client.inner().pending().stats().total_discarded.load(
                    std::sync::atomic::Ordering::Relaxed,
                ) < 1
            {
                sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(h.client.inner().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_registration_after_shutdown_fails() {
        let h = Harness::in_memory();
        h.server.register_all_room_topics(&room("room-1")).unwrap();
        timeout(SCENARIO_TIMEOUT, h.server.shutdown()).await.unwrap();

        let err = h.server.register_all_room_topics(&room("room-2")).unwrap_err();
        assert_eq!(err, RpcError::ServerClosed);
        assert_eq!(registered(&h.server, "room-2"), [false, false, false]);
    }

    #[tokio::test]
    async fn test_servers_share_bus_without_interference() {
        let h = Harness::in_memory();
        let other = AgentDispatchInternalServer::<RoomName>::new(
            Arc::new(agent_dispatch::InMemoryDispatchService::new()),
            h.bus.clone(),
        );
        h.server.register_all_room_topics(&room("room-1")).unwrap();
        other.register_all_room_topics(&room("room-2")).unwrap();

        for name in ["room-1", "room-2"] {
            let created = h
                .client
                .create_dispatch(
                    &room(name),
                    &AgentDispatch::new("greeter", name),
                    RequestOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(created.room, name);
        }
    }
}
