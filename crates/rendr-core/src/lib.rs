//! Server-side rendering core.
//!
//! Loads layouts, drives the framework bundler, keeps the compiled bundle in an
//! atomically replaced snapshot and turns requests into composed HTML pages
//! through a [`RenderBackend`].

pub mod artifacts;
pub mod assets;
pub mod backend;
pub mod bundle;
pub mod command;
pub mod compiler;
pub mod compose;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod support;
pub mod supervisor;

pub use artifacts::{ArtifactKind, ArtifactLayout};
pub use assets::AssetCache;
pub use backend::{BundleBackend, ComponentBackend, RenderBackend, RenderWorker};
pub use bundle::{Artifacts, BundleSnapshot, BundleStore};
pub use command::CommandLine;
pub use compiler::{CommandCompiler, CompileReport, Compiler};
pub use compose::{compose, AssetBase, Markers};
pub use context::{parse_payload, RenderContext, RenderResult};
pub use error::{BuildError, Error, RenderError, Result, SupportError};
pub use pipeline::{PageRequest, Pipeline};
pub use support::{SupportFile, SupportFiles};
pub use supervisor::{Mode, Phase, Published, Supervisor};
