//! Random-forest regressor: bagged CART trees with a squared-error criterion.
//!
//! Every split considers all features, visited in a per-node random order so
//! that ties between equally good features do not always favour column 0.
//! Fitting is fully determined by `random_state` and the training data.
//!
//! Columns holding only 0 and 1 (the one-hot blocks) are scored from per-node
//! sums in one pass over the node's rows. The remaining columns are sorted
//! once per tree and the order is carried through every partition.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::error::{SalesError, SalesResult};

/// Hyper-parameters of the forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub random_state: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            random_state: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> SalesResult<()> {
        if self.n_estimators == 0 {
            return Err(SalesError::invalid("n_estimators must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(SalesError::invalid("min_samples_split must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(SalesError::invalid("min_samples_leaf must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(SalesError::invalid("max_depth must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node vector; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

#[derive(Clone, Copy)]
enum Column {
    /// Only 0.0 and 1.0 occur.
    Binary,
    /// Index into the per-node sorted orders.
    Ordered(usize),
}

/// Column kinds and the sparse view of the binary columns, shared by all trees.
struct FeatureLayout {
    columns: Vec<Column>,
    ordered: Vec<usize>,
    /// Per row, the binary columns that are set.
    ones: Vec<Vec<usize>>,
}

impl FeatureLayout {
    fn new(x: ArrayView2<'_, f64>) -> Self {
        let mut ordered = Vec::new();
        let columns: Vec<Column> = x
            .columns()
            .into_iter()
            .enumerate()
            .map(|(f, col)| {
                if col.iter().all(|&v| v == 0.0 || v == 1.0) {
                    Column::Binary
                } else {
                    ordered.push(f);
                    Column::Ordered(ordered.len() - 1)
                }
            })
            .collect();
        let ones = x
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(f, &v)| matches!(columns[f], Column::Binary) && v == 1.0)
                    .map(|(f, _)| f)
                    .collect()
            })
            .collect();
        Self {
            columns,
            ordered,
            ones,
        }
    }
}

/// Rows reaching a node, as positions into the tree's bootstrap draw.
struct NodeSamples {
    positions: Vec<usize>,
    /// One list per ordered column, sorted by that column's value.
    sorted: Vec<Vec<usize>>,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    params: &'a ForestParams,
    layout: &'a FeatureLayout,
    /// Row index per position.
    draw: Vec<usize>,
    rng: StdRng,
    nodes: Vec<Node>,
    ones_sum: Vec<f64>,
    ones_count: Vec<usize>,
    goes_left: Vec<bool>,
}

impl<'a> TreeBuilder<'a> {
    fn new(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        params: &'a ForestParams,
        layout: &'a FeatureLayout,
        draw: Vec<usize>,
        rng: StdRng,
    ) -> Self {
        let n_features = layout.columns.len();
        let n_draw = draw.len();
        Self {
            x,
            y,
            params,
            layout,
            draw,
            rng,
            nodes: Vec::new(),
            ones_sum: vec![0.0; n_features],
            ones_count: vec![0; n_features],
            goes_left: vec![false; n_draw],
        }
    }

    fn build(mut self) -> RegressionTree {
        let positions: Vec<usize> = (0..self.draw.len()).collect();
        let sorted = self
            .layout
            .ordered
            .iter()
            .map(|&f| {
                let mut order = positions.clone();
                order.sort_by(|&a, &b| {
                    self.x[[self.draw[a], f]].total_cmp(&self.x[[self.draw[b], f]])
                });
                order
            })
            .collect();
        self.grow(NodeSamples { positions, sorted }, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn target(&self, pos: usize) -> f64 {
        self.y[self.draw[pos]]
    }

    fn value(&self, pos: usize, feature: usize) -> f64 {
        self.x[[self.draw[pos], feature]]
    }

    /// Grow the subtree for `node` and return its node index.
    fn grow(&mut self, node: NodeSamples, depth: usize) -> usize {
        let n = node.positions.len() as f64;
        let (sum, sq) = node.positions.iter().fold((0.0, 0.0), |(s, q), &p| {
            let t = self.target(p);
            (s + t, q + t * t)
        });
        let mean = sum / n;
        let impurity = sq - sum * sum / n;

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        let too_small = node.positions.len() < self.params.min_samples_split;
        let pure = impurity <= f64::EPSILON * sq.abs().max(1.0);
        if depth_reached || too_small || pure {
            return self.push(Node::Leaf { value: mean });
        }

        let Some(best) = self.best_split(&node, sum) else {
            return self.push(Node::Leaf { value: mean });
        };
        let (left, right) = self.partition(node, best.feature, best.threshold);

        // Reserve the slot so children land after their parent.
        let idx = self.push(Node::Leaf { value: mean });
        let left_idx = self.grow(left, depth + 1);
        let right_idx = self.grow(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Stable split of every list in `node`, so sorted orders stay sorted.
    fn partition(
        &mut self,
        node: NodeSamples,
        feature: usize,
        threshold: f64,
    ) -> (NodeSamples, NodeSamples) {
        for &p in &node.positions {
            let left = self.value(p, feature) <= threshold;
            self.goes_left[p] = left;
        }
        let goes_left = &self.goes_left;
        let split = |list: Vec<usize>| -> (Vec<usize>, Vec<usize>) {
            list.into_iter().partition(|&p| goes_left[p])
        };
        let (left_pos, right_pos) = split(node.positions);
        let (left_sorted, right_sorted): (Vec<_>, Vec<_>) =
            node.sorted.into_iter().map(split).unzip();
        (
            NodeSamples {
                positions: left_pos,
                sorted: left_sorted,
            },
            NodeSamples {
                positions: right_pos,
                sorted: right_sorted,
            },
        )
    }

    /// Maximises `sum_l^2 / n_l + sum_r^2 / n_r`, which minimises the summed
    /// squared error of the two children.
    fn best_split(&mut self, node: &NodeSamples, total: f64) -> Option<SplitCandidate> {
        let n = node.positions.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = total * total / n as f64;

        for &p in &node.positions {
            let t = self.target(p);
            for &f in &self.layout.ones[self.draw[p]] {
                self.ones_sum[f] += t;
                self.ones_count[f] += 1;
            }
        }

        let mut features: Vec<usize> = (0..self.layout.columns.len()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut offer = |feature: usize, lo: f64, hi: f64, left_sum: f64, n_left: usize| {
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                return;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            if score <= parent_score || best.as_ref().is_some_and(|b| score <= b.score) {
                return;
            }
            let mut threshold = lo + (hi - lo) / 2.0;
            if threshold >= hi {
                threshold = lo;
            }
            best = Some(SplitCandidate {
                feature,
                threshold,
                score,
            });
        };

        for feature in features {
            match self.layout.columns[feature] {
                // zeros go left
                Column::Binary => {
                    let n_ones = self.ones_count[feature];
                    offer(feature, 0.0, 1.0, total - self.ones_sum[feature], n - n_ones);
                }
                Column::Ordered(slot) => {
                    let order = &node.sorted[slot];
                    let mut left_sum = 0.0;
                    for k in 0..n - 1 {
                        left_sum += self.target(order[k]);
                        let lo = self.value(order[k], feature);
                        let hi = self.value(order[k + 1], feature);
                        if lo < hi {
                            offer(feature, lo, hi, left_sum, k + 1);
                        }
                    }
                }
            }
        }

        for &p in &node.positions {
            for &f in &self.layout.ones[self.draw[p]] {
                self.ones_sum[f] = 0.0;
                self.ones_count[f] = 0;
            }
        }
        best
    }
}

/// Ensemble of regression trees averaged at prediction time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit a forest on a dense feature matrix, one row per sample.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: &ForestParams,
    ) -> SalesResult<Self> {
        params.validate()?;
        let (n, n_features) = x.dim();
        if n == 0 {
            return Err(SalesError::invalid("cannot fit on zero rows"));
        }
        if n != y.len() {
            return Err(SalesError::invalid(format!(
                "{n} feature rows but {} targets",
                y.len()
            )));
        }
        if n_features == 0 {
            return Err(SalesError::invalid("cannot fit on zero features"));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SalesError::invalid("non-finite value in training data"));
        }

        let layout = FeatureLayout::new(x);
        let mut master = StdRng::seed_from_u64(params.random_state);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let draw: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                TreeBuilder::new(x.view(), y.view(), params, &layout, draw, rng).build()
            })
            .collect();

        Ok(Self {
            params: params.clone(),
            n_features,
            trees,
        })
    }

    /// Mean of the per-tree predictions for one row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> SalesResult<f64> {
        if row.len() != self.n_features {
            return Err(SalesError::invalid(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> SalesResult<Vec<f64>> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| if v < 20.0 { 5.0 } else { 50.0 });
        (x, y)
    }

    fn column(values: impl IntoIterator<Item = f64>) -> Array2<f64> {
        let values: Vec<f64> = values.into_iter().collect();
        Array2::from_shape_vec((values.len(), 1), values).unwrap()
    }

    #[test]
    fn single_tree_without_bootstrap_fits_exactly() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_estimators: 1,
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        assert_eq!(forest.predict(x.view()).unwrap(), y.to_vec());

        let tree = &forest.trees()[0];
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(forest.predict_row(array![19.4, 0.0].view()).unwrap(), 5.0);
        assert_eq!(forest.predict_row(array![19.6, 0.0].view()).unwrap(), 50.0);
    }

    #[test]
    fn forest_is_deterministic_for_seed() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        };
        let a = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        let b = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn predictions_stay_within_target_range() {
        let (x, y) = step_data();
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &ForestParams::default()).unwrap();
        for p in forest.predict(x.view()).unwrap() {
            assert!((5.0..=50.0).contains(&p), "prediction {p} out of range");
        }
    }

    #[test]
    fn max_depth_limits_tree() {
        let x = column((0..32).map(f64::from));
        let y = Array1::from_iter((0..32).map(|i| f64::from(i * i)));
        let params = ForestParams {
            n_estimators: 3,
            max_depth: Some(2),
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let x = column([0.0, 1.0, 2.0, 3.0]);
        let y = array![1.0, 2.0, 3.0, 100.0];
        let params = ForestParams {
            n_estimators: 1,
            bootstrap: false,
            min_samples_leaf: 2,
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        // only the 2/2 split is allowed
        assert_eq!(forest.predict_row(array![0.0].view()).unwrap(), 1.5);
        assert_eq!(forest.predict_row(array![3.0].view()).unwrap(), 51.5);
    }

    #[test]
    fn constant_target_gives_single_leaf() {
        let x = column((0..10).map(f64::from));
        let y = Array1::from_elem(10, 3.0);
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &ForestParams::default()).unwrap();
        assert!(forest.trees().iter().all(|t| t.node_count() == 1));
        assert_eq!(forest.predict_row(array![100.0].view()).unwrap(), 3.0);
    }

    #[test]
    fn binary_columns_split_at_one_half() {
        // columns: is_a, is_b, month
        let x = array![
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 2.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 2.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 2.0],
        ];
        let y = array![10.0, 10.0, 40.0, 40.0, 70.0, 70.0];
        let params = ForestParams {
            n_estimators: 1,
            bootstrap: false,
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &params).unwrap();
        assert_eq!(forest.predict(x.view()).unwrap(), y.to_vec());
        let tree = &forest.trees()[0];
        // month carries no signal, so only the indicator columns split
        assert!(tree.nodes.iter().all(|node| match node {
            Node::Split { feature, threshold, .. } => *feature != 2 && *threshold == 0.5,
            Node::Leaf { .. } => true,
        }));
    }

    #[test]
    fn layout_tells_binary_from_ordered_columns() {
        let x = array![[1.0, 0.0, 3.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let layout = FeatureLayout::new(x.view());
        assert!(matches!(layout.columns[0], Column::Binary));
        assert!(matches!(layout.columns[1], Column::Binary));
        assert!(matches!(layout.columns[2], Column::Ordered(0)));
        assert_eq!(layout.ordered, vec![2]);
        assert_eq!(layout.ones, vec![vec![0], vec![], vec![0]]);
    }

    #[test]
    fn rejects_bad_shapes() {
        let params = ForestParams::default();
        let empty = Array2::<f64>::zeros((0, 1));
        assert!(RandomForestRegressor::fit(empty.view(), Array1::<f64>::zeros(0).view(), &params).is_err());
        assert!(RandomForestRegressor::fit(column([1.0]).view(), array![1.0, 2.0].view(), &params).is_err());
        let no_features = Array2::<f64>::zeros((2, 0));
        assert!(RandomForestRegressor::fit(no_features.view(), array![1.0, 2.0].view(), &params).is_err());
        assert!(RandomForestRegressor::fit(column([f64::NAN]).view(), array![1.0].view(), &params).is_err());

        let forest = RandomForestRegressor::fit(column([1.0, 2.0]).view(), array![1.0, 2.0].view(), &params).unwrap();
        assert!(forest.predict_row(array![1.0, 2.0].view()).is_err());
    }

    #[test]
    fn rejects_bad_params() {
        let x = column([1.0, 2.0]);
        let y = array![1.0, 2.0];
        let zero_trees = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        assert!(RandomForestRegressor::fit(x.view(), y.view(), &zero_trees).is_err());
        let zero_depth = ForestParams {
            max_depth: Some(0),
            ..ForestParams::default()
        };
        assert!(RandomForestRegressor::fit(x.view(), y.view(), &zero_depth).is_err());
    }

    #[test]
    fn params_reject_unknown_keys() {
        let parsed: ForestParams = serde_json::from_str(r#"{"n_estimators": 10}"#).unwrap();
        assert_eq!(parsed.n_estimators, 10);
        assert_eq!(parsed.min_samples_split, 2);
        assert!(serde_json::from_str::<ForestParams>(r#"{"n_estimator": 10}"#).is_err());
    }
}
