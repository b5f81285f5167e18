pub mod serial;
pub mod session;
pub mod traits;

pub use serial::{SerialConfig, SerialConnector};
pub use session::Session;
pub use traits::TransportStream;
