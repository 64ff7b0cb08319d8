use super::ParamGen;

/// Delegates to a sequence of generators, moving to the next one as each is exhausted.
///
/// A model is initialized by chaining one generator per parameter group, in the same order the
/// groups are laid out in the flat buffer.
pub struct ChainedParamGen<'a> {
    param_gens: Vec<Box<dyn ParamGen + 'a>>,
    curr: usize,
}

impl<'a> ChainedParamGen<'a> {
    pub fn new(param_gens: Vec<Box<dyn ParamGen + 'a>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl ParamGen for ChainedParamGen<'_> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let mut sample = Vec::with_capacity(n);

        while sample.len() < n && self.curr < self.param_gens.len() {
            match self.param_gens[self.curr].sample(n - sample.len()) {
                Some(values) if !values.is_empty() => sample.extend(values),
                _ => self.curr += 1,
            }
        }

        (!sample.is_empty() || n == 0).then_some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::{super::ConstParamGen, *};

    #[test]
    fn empty() {
        let mut param_gen = ChainedParamGen::new(vec![]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn crosses_generator_boundaries() {
        let param_gens: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::new(0., 1)),
            Box::new(ConstParamGen::new(1., 3)),
        ];
        let mut param_gen = ChainedParamGen::new(param_gens);

        assert_eq!(param_gen.sample(2).unwrap(), [0., 1.]);
        assert_eq!(param_gen.sample(5).unwrap(), [1., 1.]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn nests() {
        let inner: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::new(1., 1)),
            Box::new(ConstParamGen::new(2., 1)),
        ];

        let param_gens: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::new(0., 1)),
            Box::new(ChainedParamGen::new(inner)),
            Box::new(ConstParamGen::new(3., 1)),
        ];
        let mut param_gen = ChainedParamGen::new(param_gens);

        assert_eq!(param_gen.sample(4).unwrap(), [0., 1., 2., 3.]);
    }
}
