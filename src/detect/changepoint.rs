//! Nonparametric change point detection (ED-PELT).
//!
//! PELT (pruned exact linear time) segmentation with the empirical
//! distribution cost of Haynes, Fearnhead and Eckley (2017), approximated on
//! `k = ceil(4 ln n)` quantiles. No assumption is made about the
//! distribution of the values; the penalty per change point is `3 ln n`.

/// Return the ascending indices at which a new, statistically distinct
/// segment of `values` starts.
///
/// `min_segment` is the minimum distance between change points; larger
/// values make detection less sensitive. Zero is treated as one.
pub fn detect(values: &[f64], min_segment: usize) -> Vec<usize> {
    let min_segment = min_segment.max(1);
    let n = values.len();
    if n <= 2 || n / 2 < min_segment {
        return Vec::new();
    }

    let penalty = 3.0 * (n as f64).ln();
    let k = n.min((4.0 * (n as f64).ln()).ceil() as usize);
    let cost = EdCost::new(values, k);

    pelt(n, min_segment, penalty, |tau1, tau2| cost.segment(tau1, tau2))
}

/// Prefix counts of values below each of the `k` quantiles, doubled so that
/// ties can count one half without leaving integer arithmetic.
struct EdCost {
    n: usize,
    partial_sums: Vec<Vec<u32>>,
}

impl EdCost {
    fn new(values: &[f64], k: usize) -> Self {
        let n = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let partial_sums = (0..k)
            .map(|i| {
                let z = -1.0 + (2.0 * i as f64 + 1.0) / k as f64;
                let p = 1.0 / (1.0 + (2.0 * n as f64 - 1.0).powf(-z));
                let t = sorted[((n - 1) as f64 * p).trunc() as usize];

                let mut sums = vec![0u32; n + 1];
                for tau in 1..=n {
                    let v = values[tau - 1];
                    sums[tau] = sums[tau - 1]
                        + if v < t {
                            2
                        } else if v == t {
                            1
                        } else {
                            0
                        };
                }
                sums
            })
            .collect();

        Self { n, partial_sums }
    }

    /// Cost of the segment `values[tau1..tau2]`.
    fn segment(&self, tau1: usize, tau2: usize) -> f64 {
        let len = (tau2 - tau1) as f64;
        let mut sum = 0.0;
        for sums in &self.partial_sums {
            let actual = sums[tau2] - sums[tau1];
            // fit of exactly 0 or 1 contributes nothing (and ln would blow up)
            if actual != 0 && actual as usize != (tau2 - tau1) * 2 {
                let fit = actual as f64 * 0.5 / len;
                sum += len * (fit * fit.ln() + (1.0 - fit) * (1.0 - fit).ln());
            }
        }
        let c = -(2.0 * self.n as f64 - 1.0).ln();
        2.0 * c / self.partial_sums.len() as f64 * sum
    }
}

fn pelt(
    n: usize,
    min_segment: usize,
    penalty: f64,
    cost: impl Fn(usize, usize) -> f64,
) -> Vec<usize> {
    // best_cost[i] is the optimal cost of values[..i]
    let mut best_cost = vec![0.0f64; n + 1];
    best_cost[0] = -penalty;
    for tau in min_segment..2 * min_segment {
        best_cost[tau] = cost(0, tau);
    }

    // previous[i] is where the last segment of the optimal split of values[..i] starts
    let mut previous = vec![0usize; n + 1];
    let mut candidates: Vec<usize> = vec![0, min_segment];
    let mut candidate_costs: Vec<f64> = Vec::with_capacity(n + 1);

    for tau in 2 * min_segment..=n {
        candidate_costs.clear();
        candidate_costs.extend(
            candidates
                .iter()
                .map(|&prev| best_cost[prev] + cost(prev, tau) + penalty),
        );

        // first minimum wins on ties
        let mut best = 0;
        for (i, &c) in candidate_costs.iter().enumerate() {
            if c < candidate_costs[best] {
                best = i;
            }
        }
        best_cost[tau] = candidate_costs[best];
        previous[tau] = candidates[best];

        // Prune candidates that can never be optimal again.
        let threshold = best_cost[tau] + penalty;
        let mut kept = 0;
        for i in 0..candidates.len() {
            if candidate_costs[i] < threshold {
                candidates[kept] = candidates[i];
                kept += 1;
            }
        }
        candidates.truncate(kept);
        candidates.push(tau + 1 - min_segment);
    }

    let mut change_points = Vec::new();
    let mut start = previous[n];
    while start != 0 {
        change_points.push(start);
        start = previous[start];
    }
    change_points.reverse();
    change_points
}
