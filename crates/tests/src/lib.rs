//! # Integration Tests
//!
//! Cross-crate tests driving the full path: mock backend port → hub →
//! forwarders → consumers on their execution contexts.
//!
//! Covers:
//! - Fan-out and per-consumer ordering across all three delivery generations
//! - Detach quiescence and best-effort cancellation of in-flight events
//! - Handle validity across a concurrent backend revoke
//! - Weak-key registry behavior and defunct-registration cleanup

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::OpaqueSurface::Empty;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use contracts::{
        ConsumerId, DamageRect, FrameConsumer, OpaqueSurface, SurfaceHandle, SurfaceId,
    };
    use hub::{ContextId, ExecutionContext, FramebufferHub};
    use mock_backend::{BackendGeneration, MockDisplayPort, RecordingConsumer};

    /// Consumer recording each delivery together with the context it ran on
    struct ContextAwareConsumer {
        id: ConsumerId,
        deliveries: Mutex<Vec<(String, Option<ContextId>)>>,
    }

    impl ContextAwareConsumer {
        fn new(id: &str) -> Self {
            Self {
                id: id.into(),
                deliveries: Mutex::new(Vec::new()),
            }
        }

        fn deliveries(&self) -> Vec<(String, Option<ContextId>)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    impl FrameConsumer for ContextAwareConsumer {
        fn consumer_id(&self) -> &ConsumerId {
            &self.id
        }

        fn on_surface_changed(&self, surface: Option<SurfaceHandle>) {
            let label = match surface {
                Some(handle) => format!("surface:{}", handle.surface_id()),
                None => "surface:none".to_string(),
            };
            self.deliveries
                .lock()
                .unwrap()
                .push((label, ExecutionContext::current()));
        }

        fn on_damage_rect(&self, rect: DamageRect) {
            self.deliveries.lock().unwrap().push((
                format!("rect:{},{},{},{}", rect.x, rect.y, rect.width, rect.height),
                ExecutionContext::current(),
            ));
        }
    }

    fn build_hub(generation: BackendGeneration) -> (Arc<MockDisplayPort>, FramebufferHub) {
        let port = Arc::new(MockDisplayPort::new(generation));
        let surface = port.renderable_surface();
        let hub = FramebufferHub::new(port.clone(), surface).unwrap();
        (port, hub)
    }

    /// End-to-end fan-out for every delivery generation: two consumers on
    /// independent contexts each observe the full event sequence in order.
    #[tokio::test]
    async fn test_e2e_fanout_all_generations() {
        for generation in [
            BackendGeneration::ConsumerChannel,
            BackendGeneration::PortCallbacks,
            BackendGeneration::LegacySurface,
        ] {
            let (port, hub) = build_hub(generation);

            let a = Arc::new(RecordingConsumer::new("a"));
            let b = Arc::new(RecordingConsumer::new("b"));
            let a_dyn: Arc<dyn FrameConsumer> = a.clone();
            let b_dyn: Arc<dyn FrameConsumer> = b.clone();
            let ctx_a = ExecutionContext::spawn("ctx_a");
            let ctx_b = ExecutionContext::spawn("ctx_b");

            hub.attach(&a_dyn, ctx_a.clone()).unwrap();
            hub.attach(&b_dyn, ctx_b.clone()).unwrap();

            let surface = port.table().create_packed_surface(32, 32);
            port.raise_surface_changed(OpaqueSurface::Handle(surface.clone()));
            port.raise_damage_rect(DamageRect::new(0, 0, 16, 16));
            port.raise_damage_rect(DamageRect::new(16, 16, 16, 16));

            ctx_a.flush().await;
            ctx_b.flush().await;

            for consumer in [&a, &b] {
                assert_eq!(consumer.event_count(), 3, "{generation:?}");
                assert_eq!(
                    consumer.surfaces(),
                    vec![Some(surface.surface_id())],
                    "{generation:?}"
                );
                assert_eq!(
                    consumer.rects(),
                    vec![
                        DamageRect::new(0, 0, 16, 16),
                        DamageRect::new(16, 16, 16, 16)
                    ],
                    "{generation:?}"
                );
            }
        }
    }

    /// Deliveries land on the consumer's declared context, never the
    /// backend's notifying thread.
    #[tokio::test]
    async fn test_deliveries_on_declared_context() {
        let (port, hub) = build_hub(BackendGeneration::ConsumerChannel);

        let consumer = Arc::new(ContextAwareConsumer::new("ctx_probe"));
        let consumer_dyn: Arc<dyn FrameConsumer> = consumer.clone();
        let ctx = ExecutionContext::spawn("declared");
        hub.attach(&consumer_dyn, ctx.clone()).unwrap();

        // Raise from a separate thread standing in for the backend's own
        // notification thread.
        let port_clone = Arc::clone(&port);
        let backend_thread = std::thread::spawn(move || {
            port_clone.raise_damage_rect(DamageRect::new(1, 2, 3, 4));
            port_clone.raise_surface_changed(OpaqueSurface::Empty);
        });
        backend_thread.join().unwrap();
        ctx.flush().await;

        let deliveries = consumer.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].0, "rect:1,2,3,4");
        assert_eq!(deliveries[1].0, "surface:none");
        for (_, context) in deliveries {
            assert_eq!(context, Some(ctx.id()));
        }
    }

    /// Scenario: attach A (context Q1); backend raises (0,0,10,10); A sees
    /// that exact rect on Q1. Detach A; backend raises (5,5,1,1); after
    /// quiescence A has not seen the second rect.
    #[tokio::test]
    async fn test_detach_stops_subsequent_deliveries() {
        let (port, hub) = build_hub(BackendGeneration::ConsumerChannel);

        let a = Arc::new(ContextAwareConsumer::new("a"));
        let a_dyn: Arc<dyn FrameConsumer> = a.clone();
        let q1 = ExecutionContext::spawn("q1");
        hub.attach(&a_dyn, q1.clone()).unwrap();

        port.raise_damage_rect(DamageRect::new(0, 0, 10, 10));
        q1.flush().await;

        let deliveries = a.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "rect:0,0,10,10");
        assert_eq!(deliveries[0].1, Some(q1.id()));

        hub.detach(a_dyn.as_ref());
        port.raise_damage_rect(DamageRect::new(5, 5, 1, 1));
        q1.flush().await;

        // Quiesced: the post-detach rect never arrives
        assert_eq!(a.deliveries().len(), 1);
    }

    /// An event queued before detach may still arrive after detach returns;
    /// cancellation is best-effort only.
    #[tokio::test]
    async fn test_in_flight_delivery_survives_detach() {
        let (port, hub) = build_hub(BackendGeneration::PortCallbacks);

        let a = Arc::new(RecordingConsumer::new("a"));
        let a_dyn: Arc<dyn FrameConsumer> = a.clone();
        let ctx = ExecutionContext::spawn("inflight");
        hub.attach(&a_dyn, ctx.clone()).unwrap();

        port.raise_damage_rect(DamageRect::new(9, 9, 9, 9));
        hub.detach(a_dyn.as_ref());
        ctx.flush().await;

        assert_eq!(a.rects(), vec![DamageRect::new(9, 9, 9, 9)]);
    }

    /// Scenario: backend raises a transport-wrapped surface, then revokes
    /// its own reference immediately. The consumer still observes a valid,
    /// readable handle for the duration of its callback.
    #[tokio::test]
    async fn test_handle_valid_across_backend_revoke() {
        let (port, hub) = build_hub(BackendGeneration::ConsumerChannel);

        let expected_id = Arc::new(Mutex::new(None::<SurfaceId>));
        let observed_len = Arc::new(AtomicUsize::new(0));
        let observed_refs = Arc::new(AtomicUsize::new(0));

        let expected_clone = Arc::clone(&expected_id);
        let len_clone = Arc::clone(&observed_len);
        let refs_clone = Arc::clone(&observed_refs);
        let consumer: Arc<dyn FrameConsumer> = Arc::new(RecordingConsumer::with_surface_probe(
            "prober",
            Box::new(move |surface| {
                let handle = surface.expect("surface should resolve");
                assert_eq!(Some(handle.surface_id()), *expected_clone.lock().unwrap());
                len_clone.store(handle.contents().len(), Ordering::SeqCst);
                refs_clone.store(handle.ref_count(), Ordering::SeqCst);
            }),
        ));

        let ctx = ExecutionContext::spawn("revoke");
        hub.attach(&consumer, ctx.clone()).unwrap();

        let surface = port.table().create_packed_surface(8, 8);
        surface.overwrite(Bytes::from(vec![0x7F; 256]));
        *expected_id.lock().unwrap() = Some(surface.surface_id());
        let token = port.table().publish(&surface);

        port.raise_surface_changed(OpaqueSurface::Transport(token));

        // The backend reclaims its references while delivery is in flight
        port.table().revoke(token);
        drop(surface);

        ctx.flush().await;

        assert_eq!(observed_len.load(Ordering::SeqCst), 256);
        // Only the forwarder's retain and the delivered clone remained
        assert_eq!(observed_refs.load(Ordering::SeqCst), 2);
    }

    /// The attach return value is a point-in-time snapshot; later changes
    /// arrive only through callbacks.
    #[tokio::test]
    async fn test_attach_snapshot_then_updates_via_callbacks() {
        let (port, hub) = build_hub(BackendGeneration::LegacySurface);

        let first = port.table().create_packed_surface(4, 4);
        port.set_current_surface(OpaqueSurface::Handle(first.clone()));

        let a = Arc::new(RecordingConsumer::new("a"));
        let a_dyn: Arc<dyn FrameConsumer> = a.clone();
        let ctx = ExecutionContext::spawn("snapshot");

        let initial = hub.attach(&a_dyn, ctx.clone()).unwrap().unwrap();
        assert!(initial.same_resource(&first));
        assert_eq!(a.event_count(), 0);

        let second = port.table().create_packed_surface(4, 4);
        port.raise_surface_changed(OpaqueSurface::Handle(second.clone()));
        ctx.flush().await;

        assert_eq!(a.surfaces(), vec![Some(second.surface_id())]);
        // The hub's own snapshot moved too
        assert!(hub
            .current_surface()
            .unwrap()
            .same_resource(&second));
    }

    /// Dropping a consumer without detach removes it from enumeration but
    /// leaks the backend registration until detach_defunct runs.
    #[tokio::test]
    async fn test_weak_registry_and_defunct_sweep() {
        let (port, hub) = build_hub(BackendGeneration::ConsumerChannel);

        let keep: Arc<dyn FrameConsumer> = Arc::new(RecordingConsumer::new("keep"));
        let drop_me: Arc<dyn FrameConsumer> = Arc::new(RecordingConsumer::new("drop_me"));
        hub.attach(&keep, ExecutionContext::spawn("keep")).unwrap();
        hub.attach(&drop_me, ExecutionContext::spawn("drop_me")).unwrap();

        drop(drop_me);

        let ids: Vec<String> = hub
            .attached_consumers()
            .iter()
            .map(|consumer| consumer.consumer_id().to_string())
            .collect();
        assert_eq!(ids, vec!["keep"]);
        assert_eq!(port.observer_count(), 2);

        assert_eq!(hub.detach_defunct(), 1);
        assert_eq!(port.observer_count(), 1);
        assert!(hub.is_attached(keep.as_ref()));
    }

    /// Delivery metrics flow into the observability aggregator.
    #[tokio::test]
    async fn test_metrics_feed_aggregator() {
        let (port, hub) = build_hub(BackendGeneration::ConsumerChannel);

        let a: Arc<dyn FrameConsumer> = Arc::new(RecordingConsumer::new("a"));
        let ctx = ExecutionContext::spawn("metrics");
        hub.attach(&a, ctx.clone()).unwrap();

        port.raise_damage_rect(DamageRect::new(0, 0, 1, 1));
        port.raise_damage_rect(DamageRect::new(0, 0, 2, 2));
        ctx.flush().await;

        let mut aggregator = observability::DeliveryStatsAggregator::new();
        for (consumer_id, stats) in hub.metrics() {
            aggregator.update(
                consumer_id.as_str(),
                stats.scheduled,
                stats.delivered,
                stats.dead_consumer,
                stats.empty_surface,
            );
        }

        let summary = aggregator.summary();
        assert_eq!(summary.consumers, 1);
        assert_eq!(summary.total_scheduled, 2);
        assert_eq!(summary.total_delivered, 2);
    }
}
