//! Terminal output for the CLI
//!
//! Styled glyph output on an interactive terminal, bracketed plain-text
//! markers under CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use ppbt::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Build x86_64-linux-gnu");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Building toolchain...");
//! // ... do work ...
//! spinner.stop("Toolchain built");
//!
//! ui::step_ok_detail(&ctx, "Archive", "x86_64-linux-gnu.tar.xz");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, section, step_info, step_ok, step_ok_detail, step_skip,
    step_warn_hint,
};
pub use progress::TaskSpinner;
