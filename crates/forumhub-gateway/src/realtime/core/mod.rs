//! Session registry and the egress engine shared by every hub.

mod realtime;
mod session_registry;

pub use realtime::RealtimeCore;
pub use session_registry::{Connection, SessionRegistry};
