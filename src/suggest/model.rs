//! Pretrained multi-output regressors exported as JSON.

use serde::{Deserialize, Serialize};

use super::ShapeError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    /// `y = coef · x + intercept`, `coef` is outputs × inputs
    Linear {
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    /// Dense layers, ReLU between them and identity on the last
    Mlp { layers: Vec<DenseLayer> },
    /// Mean of the tree predictions
    Forest {
        n_features: usize,
        trees: Vec<RegressionTree>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// inputs × outputs
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Array-form binary tree. Leaves have `children_left == -1`; each leaf's
/// `value` row holds one prediction per output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("model has no {0}")]
    Empty(&'static str),
    #[error("{what} has {actual} entries, expected {expected}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("tree {tree} node {node} is malformed")]
    BadNode { tree: usize, node: usize },
    #[error(transparent)]
    Input(#[from] ShapeError),
}

fn check_shape(what: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::Shape {
            what,
            expected,
            actual,
        })
    }
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.len()
    }

    fn outputs(&self) -> usize {
        self.biases.len()
    }

    fn forward(&self, x: &[f64], relu: bool) -> Vec<f64> {
        let mut out = self.biases.clone();
        for (xi, row) in x.iter().zip(&self.weights) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
        if relu {
            for o in &mut out {
                *o = o.max(0.0);
            }
        }
        out
    }
}

impl RegressionTree {
    fn len(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, index: usize, n_features: usize, outputs: usize) -> Result<(), ModelError> {
        let n = self.len();
        if n == 0 {
            return Err(ModelError::Empty("tree nodes"));
        }
        check_shape("children_right", n, self.children_right.len())?;
        check_shape("feature", n, self.feature.len())?;
        check_shape("threshold", n, self.threshold.len())?;
        check_shape("value", n, self.value.len())?;

        for node in 0..n {
            let bad = ModelError::BadNode { tree: index, node };
            let left = self.children_left[node];
            if self.value[node].len() != outputs {
                return Err(bad);
            }
            if left < 0 {
                continue;
            }
            let right = self.children_right[node];
            let feature = self.feature[node];
            // Children always come after their parent, so traversal terminates
            let child_ok = |c: i64| c > node as i64 && (c as usize) < n;
            let feature_ok = feature >= 0 && (feature as usize) < n_features;
            if !child_ok(left) || !child_ok(right) || !feature_ok {
                return Err(bad);
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Option<&[f64]> {
        let mut node = 0usize;
        for _ in 0..self.len() {
            let left = *self.children_left.get(node)?;
            if left < 0 {
                return self.value.get(node).map(Vec::as_slice);
            }
            let feature = usize::try_from(*self.feature.get(node)?).ok()?;
            node = if *x.get(feature)? <= *self.threshold.get(node)? {
                usize::try_from(left).ok()?
            } else {
                usize::try_from(*self.children_right.get(node)?).ok()?
            };
        }
        None
    }
}

impl RegressionModel {
    pub fn input_dim(&self) -> usize {
        match self {
            RegressionModel::Linear { coef, .. } => coef.first().map_or(0, Vec::len),
            RegressionModel::Mlp { layers } => layers.first().map_or(0, DenseLayer::inputs),
            RegressionModel::Forest { n_features, .. } => *n_features,
        }
    }

    pub fn output_dim(&self) -> usize {
        match self {
            RegressionModel::Linear { intercept, .. } => intercept.len(),
            RegressionModel::Mlp { layers } => layers.last().map_or(0, DenseLayer::outputs),
            RegressionModel::Forest { trees, .. } => trees
                .first()
                .and_then(|t| t.value.first())
                .map_or(0, Vec::len),
        }
    }

    /// Check the parameter arrays fit together.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            RegressionModel::Linear { coef, intercept } => {
                if intercept.is_empty() {
                    return Err(ModelError::Empty("outputs"));
                }
                check_shape("coef rows", intercept.len(), coef.len())?;
                let inputs = self.input_dim();
                if inputs == 0 {
                    return Err(ModelError::Empty("inputs"));
                }
                for row in coef {
                    check_shape("coef row", inputs, row.len())?;
                }
            }
            RegressionModel::Mlp { layers } => {
                if layers.is_empty() {
                    return Err(ModelError::Empty("layers"));
                }
                let mut width = self.input_dim();
                if width == 0 {
                    return Err(ModelError::Empty("inputs"));
                }
                for layer in layers {
                    check_shape("layer inputs", width, layer.inputs())?;
                    for row in &layer.weights {
                        check_shape("weight row", layer.outputs(), row.len())?;
                    }
                    width = layer.outputs();
                }
                if width == 0 {
                    return Err(ModelError::Empty("outputs"));
                }
            }
            RegressionModel::Forest { n_features, trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Empty("trees"));
                }
                let outputs = self.output_dim();
                if outputs == 0 {
                    return Err(ModelError::Empty("outputs"));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(i, *n_features, outputs)?;
                }
            }
        }
        Ok(())
    }

    pub fn predict(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        ShapeError::check("model", self.input_dim(), x.len())?;
        match self {
            RegressionModel::Linear { coef, intercept } => Ok(coef
                .iter()
                .zip(intercept)
                .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
                .collect()),
            RegressionModel::Mlp { layers } => {
                let last = layers.len().saturating_sub(1);
                let mut h = x.to_vec();
                for (i, layer) in layers.iter().enumerate() {
                    h = layer.forward(&h, i < last);
                }
                Ok(h)
            }
            RegressionModel::Forest { trees, .. } => {
                let mut sum = vec![0.0; self.output_dim()];
                for (i, tree) in trees.iter().enumerate() {
                    let leaf = tree
                        .predict(x)
                        .ok_or(ModelError::BadNode { tree: i, node: 0 })?;
                    for (s, v) in sum.iter_mut().zip(leaf) {
                        *s += v;
                    }
                }
                let n = trees.len() as f64;
                Ok(sum.into_iter().map(|s| s / n).collect())
            }
        }
    }
}
