pub mod errors;
pub mod parse;
pub mod probes;
pub mod reader;
pub mod secrets;
pub mod security;
pub mod store;
pub mod update;

pub use reader::{project_one, FunctionReader};
pub use update::Reconciler;
