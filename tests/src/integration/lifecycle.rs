//! # Lifecycle Scenarios
//!
//! Graceful shutdown against forced kill with a call in flight, client
//! close, and the node runtime's shutdown sequence.

#[cfg(test)]
mod tests {
    use super::super::support::{room, Harness, SlowService, SCENARIO_TIMEOUT};
    use agent_dispatch::AgentDispatch;
    use node_runtime::{NodeConfig, NodeRuntime};
    use rpc_core::{RequestOptions, RpcError, ServerState};
    use shared_bus::MessageBus;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    fn dispatch() -> AgentDispatch {
        AgentDispatch::new("greeter", "room-1").with_id("d-slow")
    }

    #[tokio::test]
    async fn test_shutdown_lets_in_flight_call_finish() {
        let service = SlowService::new(Duration::from_millis(200));
        let h = Harness::new(service.clone());
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        let record = dispatch();
        let call = h
            .client
            .create_dispatch(&r1, &record, RequestOptions::default());
        let shutdown = async {
            service.started.notified().await;
            h.server.shutdown().await;
        };

        let (reply, ()) = timeout(SCENARIO_TIMEOUT, async { tokio::join!(call, shutdown) })
            .await
            .unwrap();

        assert_eq!(reply.unwrap().id, "d-slow");
        assert_eq!(service.completed.load(Ordering::SeqCst), 1);
        assert_eq!(h.server.inner().state(), ServerState::Closed);
        assert_eq!(h.server.inner().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_kill_leaves_client_waiting_until_timeout() {
        let service = SlowService::new(Duration::from_secs(5));
        let client_timeout = Duration::from_millis(300);
        let h = Harness::with_client_timeout(service.clone(), client_timeout);
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        let started_at = Instant::now();
        let record = dispatch();
        let call = h
            .client
            .create_dispatch(&r1, &record, RequestOptions::default());
        let kill = async {
            service.started.notified().await;
            h.server.kill();
        };

        let (reply, ()) = timeout(SCENARIO_TIMEOUT, async { tokio::join!(call, kill) })
            .await
            .unwrap();

        let err = reply.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(started_at.elapsed() >= client_timeout);
        assert_eq!(service.completed.load(Ordering::SeqCst), 0);
        assert_eq!(h.server.inner().state(), ServerState::Closed);
        assert_eq!(h.client.inner().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_calls_is_immediate() {
        let h = Harness::in_memory();
        h.server.register_all_room_topics(&room("room-1")).unwrap();

        timeout(Duration::from_secs(1), h.server.shutdown())
            .await
            .unwrap();
        h.server.kill();
        assert_eq!(h.server.inner().state(), ServerState::Closed);
    }

    #[tokio::test]
    async fn test_client_close_fails_in_flight_call() {
        let service = SlowService::new(Duration::from_secs(5));
        let h = Harness::new(service.clone());
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        let record = dispatch();
        let call = h
            .client
            .create_dispatch(&r1, &record, RequestOptions::default());
        let close = async {
            service.started.notified().await;
            h.client.close();
        };

        let (reply, ()) = timeout(SCENARIO_TIMEOUT, async { tokio::join!(call, close) })
            .await
            .unwrap();
        assert_eq!(reply, Err(RpcError::ClientClosed));

        let after = h
            .client
            .create_dispatch(&r1, &dispatch(), RequestOptions::default())
            .await;
        assert_eq!(after, Err(RpcError::ClientClosed));
        h.server.kill();
    }

    #[tokio::test]
    async fn test_node_runtime_serves_and_shuts_down() {
        let mut config = NodeConfig::default();
        config.rooms = vec![room("room-1"), room("room-2")];
        let node = NodeRuntime::new(config);
        node.start().unwrap();

        let client = node.client().unwrap();
        for name in ["room-1", "room-2"] {
            let created = timeout(
                SCENARIO_TIMEOUT,
                client.create_dispatch(
                    &room(name),
                    &AgentDispatch::new("greeter", name),
                    RequestOptions::default(),
                ),
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(created.room, name);
        }
        assert_eq!(node.service().dispatch_count(), 2);

        timeout(SCENARIO_TIMEOUT, node.shutdown()).await.unwrap();
        assert_eq!(node.state(), ServerState::Closed);
        assert!(node.bus().is_closed());
    }
}
