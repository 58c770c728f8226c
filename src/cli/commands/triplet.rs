//! Triplet command - print the resolved target triplet

use crate::cli::args::TargetArgs;
use crate::error::PpbtResult;
use crate::triplet::Triplet;

/// Execute the triplet command
pub async fn execute(args: TargetArgs) -> PpbtResult<()> {
    let triplet = Triplet::detect(args.machine.as_deref(), args.platform.as_deref())?;
    println!("{}", triplet);
    Ok(())
}
