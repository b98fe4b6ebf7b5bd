//! Recording consumer - captures every delivery for assertions

use std::sync::Mutex;

use contracts::{ConsumerId, DamageRect, FrameConsumer, SurfaceHandle, SurfaceId};

/// One delivered event, as seen by a [`RecordingConsumer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// Surface replaced; `None` means "no surface"
    SurfaceChanged(Option<SurfaceId>),
    /// Region changed
    DamageRect(DamageRect),
}

/// Hook run inside `on_surface_changed` while the delivered handle is live.
///
/// Tests use it to inspect handle validity and the calling context, which a
/// recorded event cannot capture after the fact.
pub type SurfaceProbe = Box<dyn Fn(Option<&SurfaceHandle>) + Send + Sync>;

/// Consumer that records deliveries in order.
pub struct RecordingConsumer {
    id: ConsumerId,
    events: Mutex<Vec<RecordedEvent>>,
    surface_probe: Option<SurfaceProbe>,
}

impl RecordingConsumer {
    /// Create a recording consumer.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            events: Mutex::new(Vec::new()),
            surface_probe: None,
        }
    }

    /// Create a recording consumer with a surface probe.
    pub fn with_surface_probe(id: &str, probe: SurfaceProbe) -> Self {
        Self {
            id: id.into(),
            events: Mutex::new(Vec::new()),
            surface_probe: Some(probe),
        }
    }

    /// All recorded events, in delivery order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Just the damage rects, in delivery order.
    pub fn rects(&self) -> Vec<DamageRect> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::DamageRect(rect) => Some(rect),
                _ => None,
            })
            .collect()
    }

    /// Just the surface changes, in delivery order.
    pub fn surfaces(&self) -> Vec<Option<SurfaceId>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::SurfaceChanged(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl FrameConsumer for RecordingConsumer {
    fn consumer_id(&self) -> &ConsumerId {
        &self.id
    }

    fn on_surface_changed(&self, surface: Option<SurfaceHandle>) {
        if let Some(probe) = &self.surface_probe {
            probe(surface.as_ref());
        }
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::SurfaceChanged(
                surface.map(|handle| handle.surface_id()),
            ));
    }

    fn on_damage_rect(&self, rect: DamageRect) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::DamageRect(rect));
    }
}
