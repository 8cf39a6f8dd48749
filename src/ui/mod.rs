//! Terminal output helpers
//!
//! Interactive terminals get symbols and colour; pipes and CI get bracketed
//! plain tags so logs stay grep-able.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, remark, section, step_info,
    step_ok, step_ok_detail, step_warn, step_warn_hint,
};
