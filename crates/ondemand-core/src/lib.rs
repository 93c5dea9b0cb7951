#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod loader;
pub mod paths;
pub mod resolver;
pub mod version;

pub use compiler::{CompilerBackend, CompilerError, SwcBackend, TranspileOutput, TranspileSpec};
pub use config::{Config, LoaderConfig};
pub use error::Error;
pub use loader::{
    CompiledModule, Dialect, FrameworkLock, JsonlCapture, ModuleHost, ModuleLoader, NodeHost,
    NodeModule,
};
pub use resolver::{ModuleResolver, NodeResolver};
pub use version::VERSION;
