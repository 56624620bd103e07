/* Synchronous resolution events and the bus that delivers them */

mod bus;
mod event;

pub use bus::{handler, EventBus, Handler, Subscriber};
pub use event::{Event, EventKind, ParamResolution, ParamWithTypeResolution, ParamsResolution};
