//! Build command - run the toolchain pipeline

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::PpbtResult;
use crate::fetch::Fetcher;
use crate::pipeline::{BuildContext, BuildOptions, Pipeline};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> PpbtResult<()> {
    let ctx = UiContext::detect();
    let options = BuildOptions {
        branch: args.branch,
        machine: args.target.machine,
        platform: args.target.platform,
    };
    let build_ctx = BuildContext::from_config(config, &options)?;
    let work_root = build_ctx.dirs.root.display().to_string();
    let pipeline = Pipeline::new(build_ctx, Fetcher::new(config.fetch.options()));

    ui::intro(&ctx, &format!("Build {}", pipeline.context().triplet));
    ui::key_value(&ctx, "Work root", &work_root);

    let plan = pipeline.plan();
    if plan.is_empty() {
        ui::step_ok(&ctx, "Toolchain is up to date");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Running {} stage(s)...", plan.len()));
    let report = match pipeline.run().await {
        Ok(report) => {
            spinner.stop("Pipeline finished");
            report
        }
        Err(e) => {
            spinner.stop_error("Pipeline failed");
            return Err(e);
        }
    };

    ui::section(&ctx, "Stages");
    for stage in &report.skipped {
        ui::step_skip(&ctx, &format!("{} (already complete)", stage));
    }
    for stage in &report.executed {
        ui::step_ok(&ctx, &stage.to_string());
    }

    if let Some(package) = &report.package {
        ui::section(&ctx, "Package");
        ui::key_value(&ctx, "Archive", &package.archive.display().to_string());
        ui::key_value(&ctx, "Manifest", &package.manifest.display().to_string());
        ui::key_value(&ctx, "Files", &package.files.to_string());
        ui::key_value(&ctx, "SHA-256", &package.archive_sha256);
    }

    ui::outro_success(&ctx, &format!("Toolchain {} ready", report.triplet));
    Ok(())
}
