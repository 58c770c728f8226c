//! List command - show packaged toolchains

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::PpbtResult;
use crate::package::{list_archived_builds, ArchivedBuild};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> PpbtResult<()> {
    let dir = ConfigManager::work_dirs(config).toolchain;
    let builds = list_archived_builds(&dir)?;

    if builds.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("No packaged toolchains in {}", dir.display()));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&builds),
        OutputFormat::Json => print_json(&builds)?,
        OutputFormat::Plain => print_plain(&builds),
    }

    Ok(())
}

fn print_table(builds: &[ArchivedBuild]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Packaged toolchains");

    println!(
        "{:<28} {:<12} {:<10} {:>12} {:<8}",
        style("TRIPLET").bold(),
        style("MACHINE").bold(),
        style("PLATFORM").bold(),
        style("SIZE").bold(),
        style("MANIFEST").bold()
    );
    println!("{}", "-".repeat(74));

    for build in builds {
        let manifest = if build.has_manifest {
            style("yes").green()
        } else {
            style("missing").yellow()
        };
        println!(
            "{:<28} {:<12} {:<10} {:>12} {:<8}",
            build.triplet.to_string(),
            build.triplet.machine(),
            build.triplet.platform().to_string(),
            format_size(build.size),
            manifest
        );
    }

    println!();
    println!("{} toolchain(s)", builds.len());
}

fn print_json(builds: &[ArchivedBuild]) -> PpbtResult<()> {
    let json = serde_json::to_string_pretty(builds)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(builds: &[ArchivedBuild]) {
    for build in builds {
        println!("{}", build.triplet);
    }
}

fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / MIB)
    } else {
        format!("{} B", bytes)
    }
}
