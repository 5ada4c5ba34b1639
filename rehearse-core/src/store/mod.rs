//! Session persistence

pub mod file;
pub mod memory;
pub mod traits;

pub use file::JsonFileStore;
pub use memory::MemorySessionStore;
pub use traits::SessionStore;
