//! Toolchain build pipeline
//!
//! Probes the work tree once, plans the stages still to run and executes
//! them in order. Every stage checks the artifact it was meant to produce
//! before the next one starts, so a half-finished stage is never mistaken
//! for a complete one on the next run.

use super::context::{BuildContext, GeneratorSource};
use super::runner::{CommandRunner, CommandSpec, ProcessRunner};
use super::stage::{BuildStage, FsStageDetector, StageDetector};
use crate::archive;
use crate::error::{PpbtError, PpbtResult};
use crate::fetch::Fetcher;
use crate::package::PackageOutput;
use crate::triplet::Triplet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub triplet: Triplet,
    /// Stages run this time, in order
    pub executed: Vec<BuildStage>,
    /// Stages found complete and skipped
    pub skipped: Vec<BuildStage>,
    /// Archive written this run, if the archive stage ran
    pub package: Option<PackageOutput>,
}

impl BuildReport {
    /// Nothing needed doing
    pub fn is_cached(&self) -> bool {
        self.executed.is_empty()
    }
}

/// Drives a [`BuildContext`] through the build stages
pub struct Pipeline {
    ctx: BuildContext,
    runner: Arc<dyn CommandRunner>,
    fetcher: Fetcher,
    detector: Box<dyn StageDetector>,
}

impl Pipeline {
    /// Pipeline running real processes, logging to the work tree's log dir
    pub fn new(ctx: BuildContext, fetcher: Fetcher) -> Self {
        let runner = Arc::new(ProcessRunner::new(&ctx.dirs.logs));
        Self {
            ctx,
            runner,
            fetcher,
            detector: Box::new(FsStageDetector),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn StageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Stages the next [`run`](Self::run) would execute
    pub fn plan(&self) -> Vec<BuildStage> {
        self.detector.probe(&self.ctx).plan()
    }

    /// Run every pending stage. The first failure stops the pipeline.
    pub async fn run(&self) -> PpbtResult<BuildReport> {
        self.ctx.dirs.create_all()?;

        let plan = self.plan();
        let skipped: Vec<BuildStage> = BuildStage::ALL
            .into_iter()
            .filter(|stage| !plan.contains(stage))
            .collect();
        for stage in &skipped {
            info!("Skip stage '{}': already complete", stage);
        }

        let mut package = None;
        for stage in &plan {
            info!("Run stage '{}' for {}", stage, self.ctx.triplet);
            match stage {
                BuildStage::GeneratorAcquired => self.acquire_generator().await?,
                BuildStage::GeneratorCompiled => self.compile_generator().await?,
                BuildStage::ConfigWritten => self.write_config().await?,
                BuildStage::ToolchainBuilt => self.build_toolchain().await?,
                BuildStage::AuxToolInstalled => self.install_aux_tool().await?,
                BuildStage::Archived => package = Some(self.archive().await?),
            }
        }

        Ok(BuildReport {
            triplet: self.ctx.triplet.clone(),
            executed: plan,
            skipped,
            package,
        })
    }

    async fn acquire_generator(&self) -> PpbtResult<()> {
        let dirs = &self.ctx.dirs;
        match &self.ctx.generator {
            GeneratorSource::Git { repo, branch } => {
                let spec = CommandSpec::new("generator-clone", "git", &dirs.source).args([
                    "clone".to_string(),
                    "-b".to_string(),
                    branch.clone(),
                    repo.clone(),
                    self.ctx.generator.dir_name(),
                ]);
                self.runner.run(&spec).await?;
            }
            GeneratorSource::Release { url, .. } => {
                let tarball = self.fetcher.fetch(url, &dirs.download).await?;
                unpack(tarball, dirs.source.clone()).await?;
            }
        }
        require(self.ctx.generator_dir())
    }

    async fn compile_generator(&self) -> PpbtResult<()> {
        let dir = self.ctx.generator_dir();
        let configure = CommandSpec::new("generator-configure", "./configure", &dir)
            .arg("--enable-local");
        self.runner.run(&configure).await?;
        self.runner
            .run(&CommandSpec::new("generator-make", "make", &dir))
            .await?;
        require(self.ctx.generator_exe())
    }

    async fn write_config(&self) -> PpbtResult<()> {
        let shipped = self.ctx.shipped_config();
        if !shipped.is_file() {
            return Err(PpbtError::MissingConfig { path: shipped });
        }
        let target = self.ctx.generator_config();
        debug!("Copy {} -> {}", shipped.display(), target.display());
        tokio::fs::copy(&shipped, &target)
            .await
            .map_err(|e| PpbtError::io(format!("writing {}", target.display()), e))?;
        Ok(())
    }

    async fn build_toolchain(&self) -> PpbtResult<()> {
        let dir = self.ctx.generator_dir();
        let exe = self.ctx.generator_exe().display().to_string();
        let env = self.ctx.generator_env();

        for phase in ["source", "build"] {
            let spec = CommandSpec::new(format!("toolchain-{}", phase), exe.as_str(), &dir)
                .arg(phase)
                .envs(env.clone());
            self.runner.run(&spec).await?;
        }
        require(self.ctx.toolchain_tree())
    }

    async fn install_aux_tool(&self) -> PpbtResult<()> {
        let dirs = &self.ctx.dirs;
        let source = self.ctx.aux_source_dir();
        if !source.is_dir() {
            let tarball = self.fetcher.fetch(&self.ctx.aux_tool.url, &dirs.download).await?;
            unpack(tarball, dirs.source.clone()).await?;
            require(source.clone())?;
        }

        let binary = self.ctx.aux_binary();
        if !binary.is_file() {
            let name = &self.ctx.aux_tool.name;
            self.runner
                .run(&CommandSpec::new(format!("{}-configure", name), "./configure", &source))
                .await?;
            self.runner
                .run(&CommandSpec::new(format!("{}-make", name), "make", &source))
                .await?;
            require(binary.clone())?;
        }

        let installed = self.ctx.aux_installed();
        if let Some(bin) = installed.parent() {
            tokio::fs::create_dir_all(bin)
                .await
                .map_err(|e| PpbtError::io(format!("creating {}", bin.display()), e))?;
        }
        info!("Install {} into {}", self.ctx.aux_tool.name, installed.display());
        tokio::fs::copy(&binary, &installed)
            .await
            .map_err(|e| PpbtError::io(format!("copying {}", binary.display()), e))?;
        Ok(())
    }

    async fn archive(&self) -> PpbtResult<PackageOutput> {
        let archiver = self.ctx.archiver();
        let build = self.ctx.dirs.build.clone();
        let triplet = self.ctx.triplet.clone();
        tokio::task::spawn_blocking(move || archiver.package(&build, &triplet))
            .await
            .map_err(|e| PpbtError::Internal(format!("archive task failed: {}", e)))?
    }
}

/// Extract a downloaded tarball off the async runtime
async fn unpack(tarball: PathBuf, target: PathBuf) -> PpbtResult<()> {
    tokio::task::spawn_blocking(move || archive::extract(&tarball, &target))
        .await
        .map_err(|e| PpbtError::Internal(format!("extract task failed: {}", e)))?
}

/// A stage's expected output must exist once it finishes
fn require(path: PathBuf) -> PpbtResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PpbtError::MissingOutput { path })
    }
}
