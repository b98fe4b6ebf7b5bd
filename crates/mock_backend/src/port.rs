//! Mock display port - configurable delivery generation, event raising,
//! call recording
//!
//! One mock implements all three registration mechanisms; construction picks
//! which one the port advertises, so capability probing can be exercised
//! against every generation. Registered observers land in one shared set
//! regardless of mechanism, and event raising notifies that set on the
//! calling thread (the stand-in for the backend's own thread).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{
    BackendError, BackendErrorSink, ConsumerChannel, DamageRect, DisplayPort, OpaqueSurface,
    PortCallbacks, PortObserver, RegistrationId, RenderableSurface, SurfaceCallbackRegistry,
    SurfaceLookup,
};
use tracing::{debug, trace};

use crate::surface_table::MockSurfaceTable;

/// Which registration mechanism the mock port advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendGeneration {
    /// Per-consumer attach with correlation id and error channel
    ConsumerChannel,
    /// Attach-by-port without per-consumer identity
    PortCallbacks,
    /// UUID-keyed registration on the surface object
    LegacySurface,
    /// No registration mechanism at all
    None,
}

#[derive(Default)]
struct ObserverSet {
    keyed: HashMap<RegistrationId, Arc<dyn PortObserver>>,
    anonymous: Vec<Arc<dyn PortObserver>>,
    error_sinks: HashMap<RegistrationId, BackendErrorSink>,
}

impl ObserverSet {
    fn len(&self) -> usize {
        self.keyed.len() + self.anonymous.len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn PortObserver>> {
        self.keyed
            .values()
            .chain(self.anonymous.iter())
            .cloned()
            .collect()
    }
}

/// State shared between the port and its renderable surface.
struct PortShared {
    current: Mutex<OpaqueSurface>,
    observers: Mutex<ObserverSet>,
    attach_calls: AtomicU64,
    detach_calls: AtomicU64,
}

/// Mock device port.
pub struct MockDisplayPort {
    port_id: String,
    generation: BackendGeneration,
    table: Arc<MockSurfaceTable>,
    shared: Arc<PortShared>,
}

impl MockDisplayPort {
    /// Create a port advertising the given generation.
    pub fn new(generation: BackendGeneration) -> Self {
        Self::with_port_id("mock-port", generation)
    }

    /// Create a port with an explicit id.
    pub fn with_port_id(port_id: impl Into<String>, generation: BackendGeneration) -> Self {
        Self {
            port_id: port_id.into(),
            generation,
            table: Arc::new(MockSurfaceTable::new()),
            shared: Arc::new(PortShared {
                current: Mutex::new(OpaqueSurface::Empty),
                observers: Mutex::new(ObserverSet::default()),
                attach_calls: AtomicU64::new(0),
                detach_calls: AtomicU64::new(0),
            }),
        }
    }

    /// The port's surface table.
    pub fn table(&self) -> &Arc<MockSurfaceTable> {
        &self.table
    }

    /// The renderable surface paired with this port.
    pub fn renderable_surface(&self) -> Arc<dyn RenderableSurface> {
        Arc::new(MockSurface {
            generation: self.generation,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Set the current surface without notifying observers.
    pub fn set_current_surface(&self, surface: OpaqueSurface) {
        *self.shared.current.lock().unwrap() = surface;
    }

    /// Replace the current surface and notify every observer on the calling
    /// thread.
    pub fn raise_surface_changed(&self, surface: OpaqueSurface) {
        self.set_current_surface(surface.clone());
        for observer in self.observer_snapshot() {
            trace!(port = %self.port_id, observer = observer.observer_id(), "raising surface change");
            observer.surface_changed(surface.clone());
        }
    }

    /// Notify every observer of a damage rect on the calling thread.
    pub fn raise_damage_rect(&self, rect: DamageRect) {
        for observer in self.observer_snapshot() {
            observer.damage_rect(rect);
        }
    }

    /// Push an error through every registered error sink (generation 1 only
    /// registers sinks; other generations have no error channel).
    pub fn emit_backend_error(&self, error: BackendError) {
        let sinks: Vec<BackendErrorSink> = {
            let observers = self.shared.observers.lock().unwrap();
            observers.error_sinks.values().cloned().collect()
        };
        for sink in sinks {
            sink(error.clone());
        }
    }

    /// Number of currently registered observers, across mechanisms.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.lock().unwrap().len()
    }

    /// Total attach-side registration calls the backend received.
    pub fn attach_calls(&self) -> u64 {
        self.shared.attach_calls.load(Ordering::SeqCst)
    }

    /// Total detach-side registration calls the backend received.
    pub fn detach_calls(&self) -> u64 {
        self.shared.detach_calls.load(Ordering::SeqCst)
    }

    fn observer_snapshot(&self) -> Vec<Arc<dyn PortObserver>> {
        self.shared.observers.lock().unwrap().snapshot()
    }
}

impl DisplayPort for MockDisplayPort {
    fn port_id(&self) -> &str {
        &self.port_id
    }

    fn consumer_channel(&self) -> Option<&dyn ConsumerChannel> {
        (self.generation == BackendGeneration::ConsumerChannel)
            .then_some(self as &dyn ConsumerChannel)
    }

    fn port_callbacks(&self) -> Option<&dyn PortCallbacks> {
        (self.generation == BackendGeneration::PortCallbacks).then_some(self as &dyn PortCallbacks)
    }

    fn surface_lookup(&self) -> Arc<dyn SurfaceLookup> {
        let lookup: Arc<dyn SurfaceLookup> = self.table.clone();
        lookup
    }
}

impl ConsumerChannel for MockDisplayPort {
    fn attach_consumer(
        &self,
        registration: RegistrationId,
        observer: Arc<dyn PortObserver>,
        errors: BackendErrorSink,
    ) {
        debug!(port = %self.port_id, %registration, observer = observer.observer_id(), "consumer attached");
        let mut observers = self.shared.observers.lock().unwrap();
        observers.keyed.insert(registration, observer);
        observers.error_sinks.insert(registration, errors);
        self.shared.attach_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn detach_consumer(&self, registration: RegistrationId) {
        debug!(port = %self.port_id, %registration, "consumer detached");
        let mut observers = self.shared.observers.lock().unwrap();
        observers.keyed.remove(&registration);
        observers.error_sinks.remove(&registration);
        self.shared.detach_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl PortCallbacks for MockDisplayPort {
    fn attach(&self, observer: Arc<dyn PortObserver>) {
        debug!(port = %self.port_id, observer = observer.observer_id(), "port observer attached");
        let mut observers = self.shared.observers.lock().unwrap();
        observers.anonymous.push(observer);
        self.shared.attach_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn detach(&self, observer: &Arc<dyn PortObserver>) {
        // No per-consumer identity in this generation: the observer object
        // itself is the key, compared by data pointer.
        let target = Arc::as_ptr(observer) as *const ();
        let mut observers = self.shared.observers.lock().unwrap();
        observers
            .anonymous
            .retain(|candidate| Arc::as_ptr(candidate) as *const () != target);
        self.shared.detach_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock renderable surface sharing the port's state.
struct MockSurface {
    generation: BackendGeneration,
    shared: Arc<PortShared>,
}

impl RenderableSurface for MockSurface {
    fn current_surface(&self) -> OpaqueSurface {
        self.shared.current.lock().unwrap().clone()
    }

    fn callback_registry(&self) -> Option<&dyn SurfaceCallbackRegistry> {
        (self.generation == BackendGeneration::LegacySurface)
            .then_some(self as &dyn SurfaceCallbackRegistry)
    }
}

impl SurfaceCallbackRegistry for MockSurface {
    fn register_callbacks(&self, key: RegistrationId, observer: Arc<dyn PortObserver>) {
        debug!(%key, observer = observer.observer_id(), "surface callbacks registered");
        let mut observers = self.shared.observers.lock().unwrap();
        observers.keyed.insert(key, observer);
        self.shared.attach_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn unregister_callbacks(&self, key: RegistrationId) {
        debug!(%key, "surface callbacks unregistered");
        let mut observers = self.shared.observers.lock().unwrap();
        observers.keyed.remove(&key);
        self.shared.detach_calls.fetch_add(1, Ordering::SeqCst);
    }
}
