//! # Dispatch Round Trips
//!
//! A client calls `AgentDispatchInternal` methods on a room topic and a
//! server registered for that room answers.
//!
//! ## Flow Tested
//!
//! ```text
//! Client ──CreateDispatch("room-1")──→ Bus ──→ Server(room-1) ──→ Service
//!    ↑                                                               │
//!    └──────────────────── AgentDispatch { id: "d-42" } ←────────────┘
//! ```

#[cfg(test)]
mod tests {
    use super::super::support::{room, FixedIdService, Harness, SCENARIO_TIMEOUT};
    use agent_dispatch::{
        AgentDispatch, DeleteAgentDispatchRequest, InMemoryDispatchService,
        ListAgentDispatchRequest,
    };
    use futures::future::join_all;
    use rpc_core::{ErrorCode, RequestOptions, RpcError};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    // =========================================================================
    // CREATE
    // =========================================================================

    #[tokio::test]
    async fn test_create_dispatch_returns_handler_record() {
        let service = FixedIdService::new("d-42");
        let h = Harness::new(service.clone());
        h.server.register_create_dispatch_topic(&room("room-1")).unwrap();

        let request = AgentDispatch::new("greeter", "room-1").with_metadata("hello");
        let options = RequestOptions::default().with_timeout(Duration::from_secs(5));

        let dispatch = timeout(
            SCENARIO_TIMEOUT,
            h.client.create_dispatch(&room("room-1"), &request, options),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(dispatch, request.with_id("d-42"));
        assert_eq!(service.calls(), 1);
        assert_eq!(h.client.inner().pending().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_calls_reach_only_the_addressed_room() {
        let service = FixedIdService::new("d-1");
        let h = Harness::with_client_timeout(service.clone(), Duration::from_millis(200));
        h.server.register_all_room_topics(&room("room-1")).unwrap();

        let err = h
            .client
            .create_dispatch(
                &room("room-2"),
                &AgentDispatch::new("greeter", "room-2"),
                RequestOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(service.calls(), 0);
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    #[tokio::test]
    async fn test_delete_missing_dispatch_is_handler_error() {
        let h = Harness::in_memory();
        h.server.register_delete_dispatch_topic(&room("room-1")).unwrap();

        let err = timeout(
            SCENARIO_TIMEOUT,
            h.client.delete_dispatch(
                &room("room-1"),
                &DeleteAgentDispatchRequest {
                    dispatch_id: "d-missing".into(),
                    room: "room-1".into(),
                },
                RequestOptions::default(),
            ),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(err.is_handler(), "expected handler error, got {err:?}");
        assert!(!err.is_timeout());
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    // =========================================================================
    // FULL LIFECYCLE OF A RECORD
    // =========================================================================

    #[tokio::test]
    async fn test_create_list_delete() {
        let h = Harness::new(Arc::new(InMemoryDispatchService::new()));
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        let created = h
            .client
            .create_dispatch(
                &r1,
                &AgentDispatch::new("greeter", "room-1"),
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let listed = h
            .client
            .list_dispatch(
                &r1,
                &ListAgentDispatchRequest {
                    dispatch_id: String::new(),
                    room: "room-1".into(),
                },
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(listed.agent_dispatches, vec![created.clone()]);

        let deleted = h
            .client
            .delete_dispatch(
                &r1,
                &DeleteAgentDispatchRequest {
                    dispatch_id: created.id.clone(),
                    room: "room-1".into(),
                },
                RequestOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(deleted.is_deleted());

        let err = h
            .client
            .create_dispatch(&r1, &AgentDispatch::new("", "room-1"), RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RpcError::invalid_argument("agent_name is required")
        );
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_matched_by_request_id() {
        let h = Harness::in_memory();
        let r1 = room("room-1");
        h.server.register_all_room_topics(&r1).unwrap();

        let calls = (0..20).map(|i| {
            let request =
                AgentDispatch::new(format!("agent-{i}"), "room-1").with_id(format!("d-{i}"));
            let client = &h.client;
            let r1 = &r1;
            async move {
                let created = client
                    .create_dispatch(r1, &request, RequestOptions::default())
                    .await
                    .unwrap();
                assert_eq!(created.id, request.id);
                assert_eq!(created.agent_name, request.agent_name);
            }
        });

        timeout(SCENARIO_TIMEOUT, join_all(calls))
            .await
            .unwrap();
        assert_eq!(h.client.inner().pending().pending_count(), 0);
    }
}
