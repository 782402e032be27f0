pub mod events;
pub mod hub;
pub mod session;

pub use hub::Hub;
pub use session::ws_route;
