mod builder;
mod conv_regressor;
mod regressor;

pub use builder::RegressorBuilder;
pub use conv_regressor::ConvRegressor;
pub use regressor::Regressor;
