// One module per resource; `app` wires them under /api/v1.
pub mod properties;
pub mod requirements;
pub mod service;
pub mod users;

pub use service::{health, root};
