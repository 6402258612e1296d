/// A fixed-order numeric vector. Names live in the `FeatureIndex` of the
/// space that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub values: Vec<f64>,
}

impl Observation {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
