//! Reading the model's answer back out of its text.
//!
//! Two independent checks:
//! - [`extract_answer`]: the first `Answer: <LETTER>` line with an allowed letter
//! - [`is_format_compliant`] / [`final_answer`]: whether the *last* non-empty
//!   line is exactly that, and which letter it declares
//!
//! A record is correct only when the extracted letter, the final-line letter
//! and the gold label all agree.

mod answer;
mod format;

pub use answer::extract_answer;
pub use format::{final_answer, is_format_compliant};
