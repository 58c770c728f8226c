//! Toolchain build pipeline

pub mod build;
pub mod context;
pub mod runner;
pub mod stage;

pub use build::{BuildReport, Pipeline};
pub use context::{AuxTool, BuildContext, BuildOptions, GeneratorSource, GENERATOR_EXE};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};
pub use stage::{BuildStage, FsStageDetector, StageDetector, StageStatus};
