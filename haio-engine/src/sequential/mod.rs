//! Sequential CTA variants: `cta` rerun across many
//! calls against state that persists in a [`SequentialRegistry`], keyed
//! per `(method, template, quality_requirement, significance_level[,
//! sample_size])`.

mod state;
mod variant1;
mod variant2;
mod variant3;

pub use state::{SequentialKey, SequentialRegistry, SequentialState};
pub use variant1::run_sequential_cta_1;
pub use variant2::run_sequential_cta_2;
pub use variant3::run_sequential_cta_3;
