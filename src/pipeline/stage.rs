//! Build stages and their detection
//!
//! Stage completion is read from the filesystem, not from a journal: a
//! stage is complete when the directory or file it produces exists. The
//! probe runs once at pipeline start and [`StageStatus::plan`] turns the
//! result into the list of stages to execute.

use super::context::BuildContext;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    GeneratorAcquired,
    GeneratorCompiled,
    ConfigWritten,
    ToolchainBuilt,
    AuxToolInstalled,
    Archived,
}

impl BuildStage {
    pub const ALL: [BuildStage; 6] = [
        Self::GeneratorAcquired,
        Self::GeneratorCompiled,
        Self::ConfigWritten,
        Self::ToolchainBuilt,
        Self::AuxToolInstalled,
        Self::Archived,
    ];
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GeneratorAcquired => "acquire generator",
            Self::GeneratorCompiled => "compile generator",
            Self::ConfigWritten => "write config",
            Self::ToolchainBuilt => "build toolchain",
            Self::AuxToolInstalled => "install aux tool",
            Self::Archived => "archive",
        };
        write!(f, "{}", name)
    }
}

/// Stages found complete on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStatus {
    done: BTreeSet<BuildStage>,
}

impl StageStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status with every stage complete
    pub fn all_done() -> Self {
        Self {
            done: BuildStage::ALL.into_iter().collect(),
        }
    }

    pub fn mark(&mut self, stage: BuildStage) {
        self.done.insert(stage);
    }

    pub fn with(mut self, stage: BuildStage) -> Self {
        self.mark(stage);
        self
    }

    pub fn is_done(&self, stage: BuildStage) -> bool {
        self.done.contains(&stage)
    }

    /// Stages to run, in order.
    ///
    /// The config is only (re)written ahead of a toolchain build. A rebuilt
    /// toolchain needs the aux tool copied in again, and any change to the
    /// tree needs a fresh archive.
    pub fn plan(&self) -> Vec<BuildStage> {
        let build = !self.is_done(BuildStage::ToolchainBuilt);
        let aux = build || !self.is_done(BuildStage::AuxToolInstalled);

        BuildStage::ALL
            .into_iter()
            .filter(|stage| match stage {
                BuildStage::GeneratorAcquired | BuildStage::GeneratorCompiled => {
                    !self.is_done(*stage)
                }
                BuildStage::ConfigWritten => build && !self.is_done(*stage),
                BuildStage::ToolchainBuilt => build,
                BuildStage::AuxToolInstalled => aux,
                BuildStage::Archived => aux || !self.is_done(*stage),
            })
            .collect()
    }
}

/// Probes which stages are already complete
pub trait StageDetector: Send + Sync {
    fn probe(&self, ctx: &BuildContext) -> StageStatus;
}

/// Detects stages from the work tree
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStageDetector;

impl StageDetector for FsStageDetector {
    fn probe(&self, ctx: &BuildContext) -> StageStatus {
        let mut status = StageStatus::new();
        let archiver = ctx.archiver();

        if ctx.generator_dir().is_dir() {
            status.mark(BuildStage::GeneratorAcquired);
        }
        if ctx.generator_exe().is_file() {
            status.mark(BuildStage::GeneratorCompiled);
        }
        if config_matches(ctx) {
            status.mark(BuildStage::ConfigWritten);
        }
        if ctx.toolchain_tree().is_dir() {
            status.mark(BuildStage::ToolchainBuilt);
        }
        if ctx.aux_installed().is_file() {
            status.mark(BuildStage::AuxToolInstalled);
        }
        if archiver.archive_path(&ctx.triplet).is_file()
            && archiver.manifest_path(&ctx.triplet).is_file()
        {
            status.mark(BuildStage::Archived);
        }
        status
    }
}

/// The generator config is written when it holds the shipped bytes
fn config_matches(ctx: &BuildContext) -> bool {
    match (fs::read(ctx.shipped_config()), fs::read(ctx.generator_config())) {
        (Ok(shipped), Ok(written)) => shipped == written,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::tests::context;
    use tempfile::TempDir;

    #[test]
    fn fresh_tree_runs_everything() {
        assert_eq!(StageStatus::new().plan(), BuildStage::ALL.to_vec());
    }

    #[test]
    fn complete_tree_runs_nothing() {
        assert!(StageStatus::all_done().plan().is_empty());
    }

    #[test]
    fn cached_toolchain_skips_config_and_build() {
        let status = StageStatus::new()
            .with(BuildStage::ToolchainBuilt)
            .with(BuildStage::AuxToolInstalled)
            .with(BuildStage::Archived);
        assert_eq!(
            status.plan(),
            vec![BuildStage::GeneratorAcquired, BuildStage::GeneratorCompiled]
        );
    }

    #[test]
    fn rebuild_forces_aux_and_archive() {
        let status = StageStatus::all_done();
        let mut status = StageStatus {
            done: status
                .done
                .into_iter()
                .filter(|s| *s != BuildStage::ToolchainBuilt)
                .collect(),
        };
        assert_eq!(
            status.plan(),
            vec![
                BuildStage::ToolchainBuilt,
                BuildStage::AuxToolInstalled,
                BuildStage::Archived
            ]
        );

        status.done.remove(&BuildStage::ConfigWritten);
        assert_eq!(status.plan()[0], BuildStage::ConfigWritten);
    }

    #[test]
    fn missing_aux_tool_reinstalls_and_rearchives() {
        let status = StageStatus::new()
            .with(BuildStage::GeneratorAcquired)
            .with(BuildStage::GeneratorCompiled)
            .with(BuildStage::ToolchainBuilt)
            .with(BuildStage::Archived);
        assert_eq!(
            status.plan(),
            vec![BuildStage::AuxToolInstalled, BuildStage::Archived]
        );
    }

    #[test]
    fn missing_archive_only_rearchives() {
        let status = StageStatus::all_done();
        let status = StageStatus {
            done: status
                .done
                .into_iter()
                .filter(|s| *s != BuildStage::Archived)
                .collect(),
        };
        assert_eq!(status.plan(), vec![BuildStage::Archived]);
    }

    #[test]
    fn fs_detector_reads_work_tree() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path());
        assert_eq!(FsStageDetector.probe(&ctx), StageStatus::new());

        fs::create_dir_all(ctx.generator_dir()).unwrap();
        fs::write(ctx.generator_exe(), b"#!/bin/sh").unwrap();
        fs::create_dir_all(ctx.shipped_config().parent().unwrap()).unwrap();
        fs::write(ctx.shipped_config(), b"CT_ARCH_X86=y\n").unwrap();
        fs::write(ctx.generator_config(), b"CT_ARCH_X86=y\n").unwrap();

        let status = FsStageDetector.probe(&ctx);
        assert!(status.is_done(BuildStage::GeneratorAcquired));
        assert!(status.is_done(BuildStage::GeneratorCompiled));
        assert!(status.is_done(BuildStage::ConfigWritten));
        assert!(!status.is_done(BuildStage::ToolchainBuilt));

        fs::write(ctx.generator_config(), b"CT_ARCH_ARM=y\n").unwrap();
        assert!(!FsStageDetector.probe(&ctx).is_done(BuildStage::ConfigWritten));

        fs::create_dir_all(ctx.aux_installed().parent().unwrap()).unwrap();
        fs::write(ctx.aux_installed(), b"elf").unwrap();
        let status = FsStageDetector.probe(&ctx);
        assert!(status.is_done(BuildStage::ToolchainBuilt));
        assert!(status.is_done(BuildStage::AuxToolInstalled));
        assert!(!status.is_done(BuildStage::Archived));
    }
}
