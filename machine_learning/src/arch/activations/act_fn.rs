use super::{Relu, Sigmoid};
use crate::spec::ActFnSpec;

/// An activation fused into the layer that produces its input.
#[derive(Clone, Debug)]
pub enum ActFn {
    Relu(Relu),
    Sigmoid(Sigmoid),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(z),
            Self::Sigmoid(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(z),
            Self::Sigmoid(a) => a.df(z),
        }
    }
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Relu => Self::relu(),
            ActFnSpec::Sigmoid { amp } => Self::sigmoid(amp),
        }
    }
}
