use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    LedgerChangedEvent,
    OrderSettledEvent,
    RegisterClosedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_settled_producer: Vec<EventProducer<OrderSettledEvent>>,
    pub register_closed_producer: Vec<EventProducer<RegisterClosedEvent>>,
    pub ledger_changed_producer: Vec<EventProducer<LedgerChangedEvent>>,
}

pub struct EventHandlers {
    pub on_order_settled: Option<EventHandler<OrderSettledEvent>>,
    pub on_register_closed: Option<EventHandler<RegisterClosedEvent>>,
    pub on_ledger_changed: Option<EventHandler<LedgerChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_settled = hooks.on_order_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_register_closed = hooks.on_register_closed.map(|f| EventHandler::new(buffer_size, f));
        let on_ledger_changed = hooks.on_ledger_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_settled, on_register_closed, on_ledger_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_settled {
            result.order_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_register_closed {
            result.register_closed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_ledger_changed {
            result.ledger_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_register_closed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_ledger_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_settled: Option<Handler<OrderSettledEvent>>,
    pub on_register_closed: Option<Handler<RegisterClosedEvent>>,
    pub on_ledger_changed: Option<Handler<LedgerChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_settled = Some(Arc::new(f));
        self
    }

    pub fn on_register_closed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RegisterClosedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_register_closed = Some(Arc::new(f));
        self
    }

    pub fn on_ledger_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LedgerChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_ledger_changed = Some(Arc::new(f));
        self
    }
}
