//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, Emoji, Style};

static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
static INFO: Emoji<'_, '_> = Emoji("●", "[INFO]");

fn tag(ctx: &UiContext, symbol: &Emoji<'static, 'static>) -> &'static str {
    if ctx.use_fancy_output() {
        symbol.0
    } else {
        symbol.1
    }
}

/// Display a title line
pub fn intro(_ctx: &UiContext, title: &str) {
    println!("{}", style(title).cyan().bold());
    println!();
}

/// Display a success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    println!();
    println!("{} {}", style(tag(ctx, &OK)).green(), style(message).green().bold());
}

/// Display a warning outro
pub fn outro_warn(ctx: &UiContext, message: &str) {
    println!();
    println!("{} {}", style(tag(ctx, &WARN)).yellow(), style(message).yellow().bold());
}

/// Display a section header
pub fn section(_ctx: &UiContext, title: &str) {
    println!();
    println!("{}", style(title).bold());
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(tag(ctx, &OK)).green(), message);
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        style(tag(ctx, &OK)).green(),
        message,
        style(detail).dim()
    );
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(tag(ctx, &WARN)).yellow(), message);
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        style(tag(ctx, &WARN)).yellow(),
        message,
        style(hint).dim()
    );
}

pub fn step_info(ctx: &UiContext, message: &str) {
    println!("  {} {}", style(tag(ctx, &INFO)).cyan(), message);
}

/// Display a dimmed remark
pub fn remark(_ctx: &UiContext, message: &str) {
    println!("    {}", style(message).dim());
}

/// Print an aligned key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {:<14} {}", style(key).dim(), value);
    } else {
        println!("  {:<14} {}", key, value);
    }
}

/// Print a key-value pair coloured by status
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value_style = if ok {
        Style::new().green()
    } else {
        Style::new().yellow()
    };

    if ctx.use_fancy_output() {
        println!("  {:<14} {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let prefix = if ok { OK.1 } else { WARN.1 };
        println!("  {} {}: {}", prefix, key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tags() {
        let ctx = UiContext::plain();
        assert_eq!(tag(&ctx, &OK), "[OK]");
        assert_eq!(tag(&ctx, &INFO), "[INFO]");
    }

    #[test]
    fn output_plain_does_not_panic() {
        let ctx = UiContext::plain();
        intro(&ctx, "Test");
        step_ok(&ctx, "Step completed");
        step_warn_hint(&ctx, "Warning", "hint");
        key_value_status(&ctx, "store", "ok", true);
        outro_success(&ctx, "Done");
    }
}
