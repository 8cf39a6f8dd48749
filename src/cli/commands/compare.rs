//! Compare command - content equality of two artifact files
//!
//! Exits non-zero when the contents differ.

use crate::cli::args::CompareArgs;
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::fingerprint::same_content;
use crate::ui::{self, UiContext};

/// Execute the compare command
pub async fn execute(args: CompareArgs) -> ProvcacheResult<()> {
    let ctx = UiContext::detect();

    if !same_content(&args.origin, &args.current)? {
        return Err(ProvcacheError::ContentDiffers {
            origin: args.origin,
            current: args.current,
        });
    }

    let detail = format!("{} vs {}", args.origin.display(), args.current.display());
    ui::step_ok_detail(&ctx, "identical", &detail);
    Ok(())
}
