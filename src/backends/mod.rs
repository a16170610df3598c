//! Concrete backend drivers.

mod local;
mod memory;
mod object_store;
mod stdio;

pub use local::LocalBackend;
pub use memory::MemoryObjectClient;
pub use object_store::{ObjectClient, ObjectMeta, ObjectStoreBackend};
pub use stdio::{StdioBackend, STDIO_PATH};
