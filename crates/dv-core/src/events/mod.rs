use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

type SharedHandler = Arc<Mutex<Box<dyn EventHandler>>>;

/// System-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<SharedHandler>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Common system events
pub mod events {
    use super::Event;
    
    /// Data source loaded event
    #[derive(Debug, Clone)]
    pub struct DataSourceLoaded {
        pub source_name: String,
        pub row_count: usize,
        pub format: Option<String>,
    }
    
    /// Data source error event
    #[derive(Debug, Clone)]
    pub struct DataSourceError {
        pub source_name: String,
        pub error: String,
    }
    
    /// Raw values were replaced by typed containers
    #[derive(Debug, Clone)]
    pub struct DataFormatted {
        pub converted: usize,
        pub failed: usize,
    }
    
    /// View registered event
    #[derive(Debug, Clone)]
    pub struct ViewAdded {
        pub view_id: String,
        pub data_type: String,
    }
    
    /// View removed event
    #[derive(Debug, Clone)]
    pub struct ViewRemoved {
        pub view_id: String,
    }
    
    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }
    
    impl_event!(
        DataSourceLoaded,
        DataSourceError,
        DataFormatted,
        ViewAdded,
        ViewRemoved
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }
    
    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers
            .entry(type_id)
            .or_insert_with(Vec::new)
            .push(Arc::new(Mutex::new(handler)));
    }
    
    /// Publish an event to the handlers subscribed when publishing starts.
    ///
    /// Handlers run without the bus lock held, so they may publish or
    /// subscribe. A handler must not publish an event of its own type.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let event_handlers = self.handlers.lock().get(&type_id).cloned().unwrap_or_default();
        
        for handler in event_handlers {
            handler.lock().handle(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::events::{DataFormatted, ViewAdded, ViewRemoved};
    use std::sync::atomic::{AtomicUsize, Ordering};
    
    #[test]
    fn test_publish_reaches_matching_subscribers_only() {
        let bus = EventBus::new();
        let added = Arc::new(AtomicUsize::new(0));
        
        let counter = added.clone();
        bus.subscribe::<ViewAdded>(handler_from_fn(move |event| {
            if let Some(added) = event.as_any().downcast_ref::<ViewAdded>() {
                assert_eq!(added.view_id, "v1");
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
        
        bus.publish(ViewAdded { view_id: "v1".to_string(), data_type: "dataTypeDate".to_string() });
        bus.publish(ViewRemoved { view_id: "v1".to_string() });
        
        assert_eq!(added.load(Ordering::SeqCst), 1);
    }
    
    #[test]
    fn test_handlers_may_publish_and_subscribe() {
        let bus = Arc::new(EventBus::new());
        let removed = Arc::new(AtomicUsize::new(0));
        let formatted = Arc::new(AtomicUsize::new(0));
        
        let counter = removed.clone();
        bus.subscribe::<ViewRemoved>(handler_from_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        
        let inner_bus = bus.clone();
        let inner_counter = formatted.clone();
        bus.subscribe::<ViewAdded>(handler_from_fn(move |event| {
            if let Some(added) = event.as_any().downcast_ref::<ViewAdded>() {
                inner_bus.publish(ViewRemoved { view_id: added.view_id.clone() });
                let counter = inner_counter.clone();
                inner_bus.subscribe::<DataFormatted>(handler_from_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));
        
        bus.publish(ViewAdded { view_id: "v1".to_string(), data_type: "dataTypeDate".to_string() });
        bus.publish(DataFormatted { converted: 1, failed: 0 });
        
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert_eq!(formatted.load(Ordering::SeqCst), 1);
    }
}
