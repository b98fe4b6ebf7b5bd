//! Fan-out demo: mock backend port → hub → two consumers
//!
//! Simulates a backend pushing frames from its own thread and shows both
//! consumers observing the same event stream on independent contexts.
//!
//! Run: cargo run --bin fanout_demo

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use contracts::{ConsumerId, DamageRect, FrameConsumer, OpaqueSurface, SurfaceHandle};
use hub::{ExecutionContext, FramebufferHub, HubOptions};
use mock_backend::{BackendGeneration, MockDisplayPort};
use tracing::info;

/// Consumer that logs every delivery.
struct LoggingConsumer {
    id: ConsumerId,
}

impl LoggingConsumer {
    fn new(id: &str) -> Arc<dyn FrameConsumer> {
        Arc::new(Self { id: id.into() })
    }
}

impl FrameConsumer for LoggingConsumer {
    fn consumer_id(&self) -> &ConsumerId {
        &self.id
    }

    fn on_surface_changed(&self, surface: Option<SurfaceHandle>) {
        match surface {
            Some(handle) => info!(
                consumer = %self.id,
                surface = %handle.surface_id(),
                bytes = handle.contents().len(),
                "surface changed"
            ),
            None => info!(consumer = %self.id, "surface gone"),
        }
    }

    fn on_damage_rect(&self, rect: DamageRect) {
        info!(
            consumer = %self.id,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "damage rect"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_with_config(observability::ObservabilityConfig {
        log_format: observability::LogFormat::Pretty,
        metrics_port: None,
        default_log_level: "info".to_string(),
    })?;

    let port = Arc::new(MockDisplayPort::with_port_id(
        "demo-port",
        BackendGeneration::ConsumerChannel,
    ));
    let surface = port.renderable_surface();

    let hub = FramebufferHub::with_options(
        port.clone(),
        surface,
        HubOptions {
            on_backend_error: Some(Arc::new(|error| {
                info!(code = error.code, message = %error.message, "backend error surfaced");
            })),
        },
    )?;

    let preview = LoggingConsumer::new("preview");
    let recorder = LoggingConsumer::new("recorder");
    let preview_ctx = ExecutionContext::spawn("preview_ctx");
    let recorder_ctx = ExecutionContext::spawn("recorder_ctx");

    hub.attach(&preview, preview_ctx.clone())?;
    hub.attach(&recorder, recorder_ctx.clone())?;
    observability::set_attached_consumers(hub.attached_count());

    // Backend thread: publish a few frames with damage, replacing the
    // surface every other frame.
    let backend = Arc::clone(&port);
    let feeder = thread::spawn(move || {
        for frame in 0u32..6 {
            if frame % 2 == 0 {
                let surface = backend.table().create_packed_surface(64, 64);
                surface.overwrite(Bytes::from(vec![frame as u8; 64 * 64 * 4]));
                let token = backend.table().publish(&surface);
                backend.raise_surface_changed(OpaqueSurface::Transport(token));
            }
            backend.raise_damage_rect(DamageRect::new(0, (frame * 8) as i32, 64, 8));
            thread::sleep(Duration::from_millis(30));
        }
    });
    feeder.join().expect("backend thread panicked");

    preview_ctx.flush().await;
    recorder_ctx.flush().await;

    let mut aggregator = observability::DeliveryStatsAggregator::new();
    for (consumer_id, stats) in hub.metrics() {
        observability::record_delivery_stats(consumer_id.as_str(), stats.scheduled, stats.delivered);
        aggregator.update(
            consumer_id.as_str(),
            stats.scheduled,
            stats.delivered,
            stats.dead_consumer,
            stats.empty_surface,
        );
    }
    println!("{}", aggregator.summary());

    hub.detach_all();
    observability::set_attached_consumers(hub.attached_count());

    Ok(())
}
