mod connection;
mod definition;
mod parameter;
mod step;

pub use connection::Connection;
pub use definition::{Definition, TransInfo};
pub use parameter::Parameter;
pub use step::{Hop, Step};
