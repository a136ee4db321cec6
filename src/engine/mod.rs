pub mod entity;
pub mod interp;
pub mod loader;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod value;

pub use entity::{Entity, EntityId, EntityRef};
pub use loader::{load_all, load_unit, DirectorySource, LoadReport, MemorySource, ScriptSourceProvider, SourceUnit};
pub use runtime::Runtime;
pub use scheduler::Scheduler;
pub use value::Value;
