pub mod hypergeometric;
pub mod uniform;

pub use hypergeometric::HgSampler;
pub use uniform::UniformSampler;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplerError {
    #[error(
        "invalid hypergeometric parameters: population {population}, \
         successes {successes}, draws {draws}"
    )]
    InvalidParameters {
        population: u64,
        successes: u64,
        draws: u64,
    },
}
