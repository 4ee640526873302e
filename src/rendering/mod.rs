//! Rendering: prompt text going to the model, and run reports going to the terminal.
//!
//! Prompt templates are selected by [`PromptFamily`](crate::types::PromptFamily),
//! resolved once per dataset on the descriptor.

mod family;
mod prompt;
pub mod report;

pub use family::{guidance, tutoring_preamble};
pub use prompt::{
    FORMAT_INSTRUCTION, render_auditor_prompt, render_critique_prompt, render_distill_prompt,
    render_final_prompt, render_mcq_prompt, render_producer_prompt,
};
