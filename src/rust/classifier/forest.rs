use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::sense::Sense;

const N_CLASSES: usize = 2;

/// How many candidate features each split examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `sqrt(n_features)`, at least one
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(n) => n,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Hyperparameters of the random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// `None` grows every tree until its leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        distribution: [f64; N_CLASSES],
    },
    /// Children are indices into the owning tree's node list.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl TreeNode {
    fn leaf(counts: [usize; N_CLASSES]) -> Self {
        let total = (counts[0] + counts[1]).max(1) as f64;
        TreeNode::Leaf {
            distribution: [counts[0] as f64 / total, counts[1] as f64 / total],
        }
    }
}

/// A decision tree stored as a flat node list. The root is node 0 and every
/// child index is greater than its parent's, so the serialized form has the
/// same nesting depth however deep the tree grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn predict_proba(&self, row: &ArrayView1<f64>) -> [f64; N_CLASSES] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { distribution } => return *distribution,
                TreeNode::Split { feature, threshold, left, right } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut deepest = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            deepest = deepest.max(depths[i]);
            if let TreeNode::Split { left, right, .. } = node {
                let child_depth = depths[i] + 1;
                for child in [*left, *right] {
                    if let Some(depth) = depths.get_mut(child) {
                        *depth = child_depth;
                    }
                }
            }
        }
        deepest
    }

    fn is_consistent(&self, n_features: usize) -> bool {
        let len = self.nodes.len();
        len > 0
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                TreeNode::Leaf { distribution } => {
                    distribution.iter().all(|p| p.is_finite() && *p >= 0.0)
                        && (distribution.iter().sum::<f64>() - 1.0).abs() < 1e-6
                }
                TreeNode::Split { feature, threshold, left, right } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && i < *left
                        && i < *right
                        && *left < len
                        && *right < len
                }
            })
    }
}

fn gini(counts: [usize; N_CLASSES], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

struct TreeBuilder<'f, 'b> {
    features: ArrayView2<'f, f64>,
    labels: &'b [usize],
    config: &'b ForestConfig,
    candidates: usize,
    rng: &'b mut StdRng,
}

impl TreeBuilder<'_, '_> {
    fn class_counts(&self, samples: &[usize]) -> [usize; N_CLASSES] {
        let mut counts = [0; N_CLASSES];
        for &i in samples {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    /// Grows a tree depth-first with an explicit work list.
    fn build(&mut self, bootstrap: Vec<usize>) -> DecisionTree {
        let mut nodes = vec![TreeNode::leaf([0, 0])];
        let mut pending = vec![(0usize, bootstrap, 0usize)];

        while let Some((slot, samples, depth)) = pending.pop() {
            let counts = self.class_counts(&samples);
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let too_deep = self.config.max_depth.is_some_and(|max| depth >= max);
            let split = if pure || too_deep || samples.len() < self.config.min_samples_split {
                None
            } else {
                self.best_split(&samples, counts)
            };

            let Some((feature, threshold)) = split else {
                nodes[slot] = TreeNode::leaf(counts);
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .partition(|&&i| self.features[[i, feature]] <= threshold);

            let left_slot = nodes.len();
            let right_slot = left_slot + 1;
            nodes.push(TreeNode::leaf([0, 0]));
            nodes.push(TreeNode::leaf([0, 0]));
            nodes[slot] = TreeNode::Split {
                feature,
                threshold,
                left: left_slot,
                right: right_slot,
            };
            pending.push((right_slot, right, depth + 1));
            pending.push((left_slot, left, depth + 1));
        }

        DecisionTree { nodes }
    }

    /// Best Gini split over a random subset of features. Constant features are
    /// skipped without counting against the candidate budget, so a split is
    /// found whenever any feature separates the samples.
    fn best_split(&mut self, samples: &[usize], counts: [usize; N_CLASSES]) -> Option<(usize, f64)> {
        let total = samples.len();
        let parent = gini(counts, total);

        let mut order: Vec<usize> = (0..self.features.ncols()).collect();
        order.shuffle(&mut *self.rng);

        let mut best: Option<(usize, f64, f64)> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(total);
        let mut visited = 0;

        for feature in order {
            if visited >= self.candidates {
                break;
            }
            column.clear();
            column.extend(samples.iter().map(|&i| (self.features[[i, feature]], self.labels[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            if column[0].0 == column[total - 1].0 {
                continue;
            }
            visited += 1;

            let mut left = [0usize; N_CLASSES];
            for k in 0..total - 1 {
                left[column[k].1] += 1;
                let (value, next) = (column[k].0, column[k + 1].0);
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = total - n_left;
                let right = [counts[0] - left[0], counts[1] - left[1]];
                let impurity = (n_left as f64 * gini(left, n_left)
                    + n_right as f64 * gini(right, n_right))
                    / total as f64;
                let gain = parent - impurity;

                if best.map_or(true, |(_, _, best_gain)| gain > best_gain) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some((feature, threshold, gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Bagged ensemble of Gini decision trees over dense `f64` features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fits the forest on one row of `features` per label.
    ///
    /// # Errors
    /// - `LabelCountMismatch` if rows and labels disagree
    /// - `InsufficientClasses` if a class has no examples
    /// - `BuildError` if the configuration asks for zero trees
    pub fn fit(
        config: &ForestConfig,
        features: ArrayView2<f64>,
        labels: &[Sense],
    ) -> Result<Self, ClassifierError> {
        if features.nrows() != labels.len() {
            return Err(ClassifierError::LabelCountMismatch {
                texts: features.nrows(),
                labels: labels.len(),
            });
        }
        if config.n_estimators == 0 {
            return Err(ClassifierError::BuildError("Forest needs at least one tree".into()));
        }
        for sense in Sense::ALL {
            if !labels.contains(&sense) {
                return Err(ClassifierError::InsufficientClasses(format!(
                    "no training examples labelled {}",
                    sense
                )));
            }
        }

        let labels: Vec<usize> = labels.iter().map(|s| s.index()).collect();
        let n_samples = labels.len();
        let n_features = features.ncols();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let candidates = config.max_features.resolve(n_features);

        let mut trees = Vec::with_capacity(config.n_estimators);
        for t in 0..config.n_estimators {
            let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let mut builder = TreeBuilder {
                features,
                labels: &labels,
                config,
                candidates,
                rng: &mut rng,
            };
            let tree = builder.build(bootstrap);
            debug!(
                "Grew tree {}/{} ({} nodes, depth {})",
                t + 1,
                config.n_estimators,
                tree.nodes.len(),
                tree.depth()
            );
            trees.push(tree);
        }

        Ok(Self { trees, n_features })
    }

    /// Mean of the per-tree leaf class distributions, indexed by [`Sense::index`].
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<[f64; N_CLASSES], ClassifierError> {
        if row.len() != self.n_features {
            return Err(ClassifierError::ShapeMismatch(format!(
                "feature vector has {} columns, forest expects {}",
                row.len(),
                self.n_features
            )));
        }
        let mut sum = [0.0; N_CLASSES];
        for tree in &self.trees {
            let p = tree.predict_proba(&row);
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Depth of the deepest tree; a lone leaf has depth 0.
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }

    pub(crate) fn is_consistent(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_consistent(self.n_features))
    }
}
