//! Extract command - unpack the packaged toolchain

use crate::cli::args::ExtractArgs;
use crate::config::Config;
use crate::environ::Toolchain;
use crate::error::{PpbtError, PpbtResult};
use crate::triplet::Triplet;
use crate::ui::{self, UiContext};

/// Execute the extract command
pub async fn execute(args: ExtractArgs, config: &Config) -> PpbtResult<()> {
    let ctx = UiContext::detect();
    let triplet = Triplet::detect(args.target.machine.as_deref(), args.target.platform.as_deref())?;
    let toolchain = Toolchain::from_config(config, triplet);
    let dir = toolchain.dir();

    let force = args.force;
    let extracted = tokio::task::spawn_blocking(move || toolchain.ensure_extracted(force))
        .await
        .map_err(|e| PpbtError::Internal(format!("extract task failed: {}", e)))??;

    if extracted {
        ui::step_ok_detail(&ctx, "Toolchain extracted", &dir.display().to_string());
    } else {
        ui::step_warn_hint(
            &ctx,
            &format!("Toolchain already extracted at {}", dir.display()),
            "Use --force to replace it",
        );
    }
    Ok(())
}
