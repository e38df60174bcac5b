//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `loop_control.rs` - `break`/`continue` outside of a loop
//! - `reserved_name.rs` - binding over a built-in name such as `tools`
//! - `unreachable_code.rs` - code after a statement that always exits

mod loop_control;
mod reserved_name;
mod unreachable_code;

pub use loop_control::LoopControlRule;
pub use reserved_name::ReservedNameRule;
pub use unreachable_code::UnreachableCodeRule;
