pub mod registry;
pub mod routes;

pub use registry::TableRegistry;
pub use routes::{router, ServerContext};
