/* Event bus: ordered handler lists per event kind */

use super::event::{Event, EventKind, ParamResolution, ParamWithTypeResolution, ParamsResolution};
use std::collections::HashMap;
use std::sync::Arc;

/* A subscribed callback */
pub type Handler = Arc<dyn Fn(&mut Event<'_, '_>) + Send + Sync>;

/* Box a closure as a handler */
pub fn handler<F>(callback: F) -> Handler
where
    F: Fn(&mut Event<'_, '_>) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/* Something that registers several handlers at once */
pub trait Subscriber {
    fn subscribed_events(&self) -> Vec<(EventKind, Handler)>;
}

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /* Append a handler; handlers run in registration order */
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&mut Event<'_, '_>) + Send + Sync + 'static,
    {
        self.subscribe_handler(kind, self::handler(handler));
    }

    pub fn subscribe_handler(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /* Register every handler a subscriber lists */
    pub fn register(&mut self, subscriber: &dyn Subscriber) {
        for (kind, handler) in subscriber.subscribed_events() {
            self.subscribe_handler(kind, handler);
        }
    }

    pub fn on_before_params<F>(&mut self, handler: F)
    where
        F: Fn(&mut ParamsResolution<'_>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::BeforeParamsResolution, move |event| {
            if let Event::BeforeParamsResolution(inner) = event {
                handler(&mut **inner);
            }
        });
    }

    pub fn on_before_param<F>(&mut self, handler: F)
    where
        F: Fn(&mut ParamResolution<'_>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::BeforeParamResolution, move |event| {
            if let Event::BeforeParamResolution(inner) = event {
                handler(&mut **inner);
            }
        });
    }

    pub fn on_before_param_with_type<F>(&mut self, handler: F)
    where
        F: Fn(&mut ParamWithTypeResolution<'_>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::BeforeParamWithTypeResolution, move |event| {
            if let Event::BeforeParamWithTypeResolution(inner) = event {
                handler(&mut **inner);
            }
        });
    }

    pub fn on_after_params<F>(&mut self, handler: F)
    where
        F: Fn(&mut ParamsResolution<'_>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::AfterParamsResolution, move |event| {
            if let Event::AfterParamsResolution(inner) = event {
                handler(&mut **inner);
            }
        });
    }

    /* Run every handler for the event's kind, synchronously and in order */
    pub fn dispatch(&self, event: &mut Event<'_, '_>) {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            return;
        };
        tracing::trace!(event = %event.kind(), handlers = handlers.len(), "dispatching");
        for handler in handlers {
            handler(&mut *event);
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Params, Value};
    use constructor_types::ParameterDescriptor;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
    }

    impl Subscriber for Recorder {
        fn subscribed_events(&self) -> Vec<(EventKind, Handler)> {
            EventKind::ALL
                .iter()
                .map(|kind| {
                    let seen = Arc::clone(&self.seen);
                    let recorded = handler(move |event| seen.lock().push(event.kind()));
                    (*kind, recorded)
                })
                .collect()
        }
    }

    #[test]
    fn handlers_run_in_registration_order_and_last_override_wins() {
        let mut bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        bus.on_before_param(move |event| {
            first.lock().push("first");
            event.set_value(json!("from first"));
        });
        let second = Arc::clone(&order);
        bus.on_before_param(move |event| {
            /* the second handler sees the first override */
            assert_eq!(event.value(), &Value::from(json!("from first")));
            second.lock().push("second");
            event.set_value(json!("from second"));
        });

        let descriptor = ParameterDescriptor::parse("center", "Point").expect("descriptor");
        let mut resolution = ParamResolution::new(&descriptor, Value::none());
        bus.dispatch(&mut Event::BeforeParamResolution(&mut resolution));

        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(resolution.into_value(), Value::from(json!("from second")));
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.register(&Recorder {
            seen: Arc::clone(&seen),
        });

        assert_eq!(bus.handler_count(EventKind::AfterParamsResolution), 1);

        let mut params = ParamsResolution::new("Point", Params::new());
        bus.dispatch(&mut Event::AfterParamsResolution(&mut params));

        assert_eq!(*seen.lock(), vec![EventKind::AfterParamsResolution]);
    }

    #[test]
    fn empty_bus_leaves_value_untouched() {
        let bus = EventBus::new();
        assert!(bus.is_empty());

        let mut params = Params::new();
        params.insert("x".to_string(), Value::from(json!(1)));
        let mut resolution = ParamsResolution::new("Point", params.clone());
        bus.dispatch(&mut Event::BeforeParamsResolution(&mut resolution));

        assert_eq!(resolution.into_value(), params);
    }
}
