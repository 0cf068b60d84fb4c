//! Route table and the two façades that serve it.

pub mod dispatch;
pub mod server;
pub mod table;

pub use dispatch::Dispatcher;
pub use server::app;
pub use table::{Endpoint, Route, RouteMatch, RouteTable};
