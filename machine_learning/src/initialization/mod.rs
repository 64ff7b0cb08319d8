//! Generators of the initial values of a model's flat parameter buffer.

mod chained;
mod constant;
mod param_gen;
mod random;
mod truncated;

pub use chained::ChainedParamGen;
pub use constant::ConstParamGen;
pub use param_gen::ParamGen;
pub use random::RandParamGen;
pub use truncated::TruncatedNormal;
