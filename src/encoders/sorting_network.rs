//! A parametric even-odd sorting network for cardinality constraints, after Abio et al.
//! (CP 2013). The recursive construction chooses between the pairwise merge network, the
//! simplified (truncated) merge, and direct encodings, driven by a `(vars, clauses)` cost model.
//! Which comparator clauses are emitted depends on the requested direction: an `at least k`
//! query only needs the output-to-input implications, `at most k` only the converse, and the
//! full/equality forms need both.

use itertools::Itertools;

use crate::basic_types::Literal;
use crate::calabash_asserts::calabash_assert_eq_simple;
use crate::calabash_asserts::calabash_assert_simple;
use crate::engine::SatContext;

/// The direction of the encoding currently being emitted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SortMode {
    AtLeast,
    AtLeastFull,
    AtMost,
    AtMostFull,
    Equal,
}

impl SortMode {
    /// Whether clauses deriving outputs from inputs are needed (everything except a pure
    /// `at least` query).
    fn emits_input_implies_output(self) -> bool {
        !matches!(self, SortMode::AtLeast)
    }

    /// Whether clauses deriving inputs from outputs are needed (everything except a pure
    /// `at most` query).
    fn emits_output_implies_input(self) -> bool {
        !matches!(self, SortMode::AtMost)
    }
}

/// The cost of a (sub)network: fresh variables and clauses, ordered by `5*vars + clauses`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct NetworkCost {
    vars: u64,
    clauses: u64,
}

impl NetworkCost {
    const LAMBDA: u64 = 5;

    fn new(vars: u64, clauses: u64) -> NetworkCost {
        NetworkCost { vars, clauses }
    }

    pub(crate) fn to_scalar(self) -> u64 {
        Self::LAMBDA * self.vars + self.clauses
    }

    fn cheaper_than(self, other: NetworkCost) -> bool {
        self.to_scalar() < other.to_scalar()
    }

    fn scale(self, n: u64) -> NetworkCost {
        NetworkCost::new(self.vars * n, self.clauses * n)
    }
}

impl std::ops::Add for NetworkCost {
    type Output = NetworkCost;
    fn add(self, other: NetworkCost) -> NetworkCost {
        NetworkCost::new(self.vars + other.vars, self.clauses + other.clauses)
    }
}

/// Compiles cardinality bounds over literal sequences into clauses in the host context,
/// counting the fresh variables and clauses it introduces.
pub struct SortingNetwork<'a> {
    context: &'a mut SatContext,
    mode: SortMode,
    num_variables: u64,
    num_clauses: u64,
}

impl<'a> SortingNetwork<'a> {
    pub fn new(context: &'a mut SatContext) -> SortingNetwork<'a> {
        SortingNetwork {
            context,
            mode: SortMode::AtLeast,
            num_variables: 0,
            num_clauses: 0,
        }
    }

    /// The `(fresh variables, clauses)` introduced so far, consuming the network and releasing
    /// the context.
    pub fn into_counts(self) -> (u64, u64) {
        (self.num_variables, self.num_clauses)
    }

    /// Returns a literal that holds when at least `k` of `xs` are true. With `full` the literal
    /// is constrained in both directions; otherwise only the literal's truth forces the inputs.
    pub fn at_least(&mut self, full: bool, k: usize, xs: &[Literal]) -> Literal {
        let n = xs.len();
        if k > n {
            return Literal::FALSE;
        }
        if k == 0 {
            return Literal::TRUE;
        }
        if 2 * k > n {
            // At least k out of n is at most n - k complements; the dual side is smaller.
            let negated: Vec<Literal> = xs.iter().map(|x| !*x).collect();
            return self.at_most(full, n - k, &negated);
        }
        self.mode = if full {
            SortMode::AtLeastFull
        } else {
            SortMode::AtLeast
        };
        let out = self.card(k, xs);
        out[k - 1]
    }

    /// Returns a literal that holds when at most `k` of `xs` are true.
    pub fn at_most(&mut self, full: bool, k: usize, xs: &[Literal]) -> Literal {
        let n = xs.len();
        if k >= n {
            return Literal::TRUE;
        }
        if 2 * k > n {
            let negated: Vec<Literal> = xs.iter().map(|x| !*x).collect();
            return self.at_least(full, n - k, &negated);
        }
        self.mode = if full {
            SortMode::AtMostFull
        } else {
            SortMode::AtMost
        };
        let out = self.card(k + 1, xs);
        !out[k]
    }

    /// Returns a literal that holds when exactly `k` of `xs` are true. Both comparator
    /// directions are emitted, so the result is fully constrained.
    pub fn equal(&mut self, k: usize, xs: &[Literal]) -> Literal {
        let n = xs.len();
        if k > n {
            return Literal::FALSE;
        }
        if n == 0 {
            return Literal::TRUE;
        }
        if 2 * k > n {
            let negated: Vec<Literal> = xs.iter().map(|x| !*x).collect();
            return self.equal(n - k, &negated);
        }
        self.mode = SortMode::Equal;
        let out = self.card(k + 1, xs);
        if k == 0 {
            return !out[0];
        }
        let result = self.fresh();
        self.add_clause(vec![!result, out[k - 1]]);
        self.add_clause(vec![!result, !out[k]]);
        self.add_clause(vec![result, !out[k - 1], out[k]]);
        result
    }

    /// The first `min(k, n)` sorted outputs of `xs`.
    fn card(&mut self, k: usize, xs: &[Literal]) -> Vec<Literal> {
        let n = xs.len();
        if n <= k {
            return self.sorting(xs);
        }
        if self.use_dcard(k, n) {
            return self.dsorting(k, xs);
        }
        let l = n / 2;
        let out1 = self.card(k, &xs[..l]);
        let out2 = self.card(k, &xs[l..]);
        self.smerge(k, &out1, &out2)
    }

    /// Fully sorts `xs`.
    fn sorting(&mut self, xs: &[Literal]) -> Vec<Literal> {
        let n = xs.len();
        match n {
            0 => vec![],
            1 => vec![xs[0]],
            2 => self.merge(&xs[..1], &xs[1..]),
            _ => {
                if self.use_dsorting(n) {
                    self.dsorting(n, xs)
                } else {
                    let l = n / 2;
                    let out1 = self.sorting(&xs[..l]);
                    let out2 = self.sorting(&xs[l..]);
                    self.merge(&out1, &out2)
                }
            }
        }
    }

    /// Merges two sorted sequences into one sorted sequence.
    fn merge(&mut self, a: &[Literal], b: &[Literal]) -> Vec<Literal> {
        if a.len() == 1 && b.len() == 1 {
            let y1 = self.max_literal(a[0], b[0]);
            let y2 = self.min_literal(a[0], b[0]);
            self.comparator(a[0], b[0], y1, y2);
            return vec![y1, y2];
        }
        if a.is_empty() {
            return b.to_vec();
        }
        if b.is_empty() {
            return a.to_vec();
        }
        if self.use_dsmerge(a.len(), b.len(), a.len() + b.len()) {
            return self.dsmerge(a.len() + b.len(), a, b);
        }
        if a.len() % 2 == 0 && b.len() % 2 == 1 {
            return self.merge(b, a);
        }
        let (even_a, odd_a) = split(a);
        let (even_b, odd_b) = split(b);
        let out1 = self.merge(&even_a, &even_b);
        let out2 = self.merge(&odd_a, &odd_b);
        self.interleave(&out1, &out2)
    }

    /// Zips two sorted sequences produced by an even-odd split with a row of 2-comparators
    /// between the interior elements.
    fn interleave(&mut self, a: &[Literal], b: &[Literal]) -> Vec<Literal> {
        calabash_assert_simple!(a.len() >= b.len() && a.len() <= b.len() + 2);
        calabash_assert_simple!(!a.is_empty());

        let mut out = vec![a[0]];
        let pairs = std::cmp::min(a.len() - 1, b.len());
        for i in 0..pairs {
            let y1 = self.max_literal(a[i + 1], b[i]);
            let y2 = self.min_literal(a[i + 1], b[i]);
            self.comparator(a[i + 1], b[i], y1, y2);
            out.push(y1);
            out.push(y2);
        }
        if a.len() == b.len() {
            out.push(b[pairs]);
        } else if a.len() == b.len() + 2 {
            out.push(a[pairs + 1]);
        }
        calabash_assert_eq_simple!(a.len() + b.len(), out.len());
        out
    }

    /// Merges two sorted sequences, truncated to the first `c` outputs.
    fn smerge(&mut self, c: usize, a: &[Literal], b: &[Literal]) -> Vec<Literal> {
        let out = if a.len() == 1 && b.len() == 1 && c == 1 {
            let y = self.max_literal(a[0], b[0]);
            if self.mode.emits_input_implies_output() {
                self.add_clause(vec![!a[0], y]);
                self.add_clause(vec![!b[0], y]);
            }
            if self.mode.emits_output_implies_input() {
                self.add_clause(vec![!y, a[0], b[0]]);
            }
            vec![y]
        } else if a.is_empty() {
            b[..std::cmp::min(c, b.len())].to_vec()
        } else if b.is_empty() {
            a[..std::cmp::min(c, a.len())].to_vec()
        } else if a.len() > c {
            self.smerge(c, &a[..c], b)
        } else if b.len() > c {
            self.smerge(c, a, &b[..c])
        } else if a.len() + b.len() <= c {
            self.merge(a, b)
        } else if self.use_dsmerge(a.len(), b.len(), c) {
            self.dsmerge(c, a, b)
        } else {
            let (even_a, odd_a) = split(a);
            let (even_b, odd_b) = split(b);
            let (c1, c2) = if c % 2 == 0 {
                (1 + c / 2, c / 2)
            } else {
                ((c + 1) / 2, (c - 1) / 2)
            };
            let mut out1 = self.smerge(c1, &even_a, &even_b);
            let mut out2 = self.smerge(c2, &odd_a, &odd_b);
            calabash_assert_eq_simple!(
                std::cmp::min(even_a.len() + even_b.len(), c1),
                out1.len()
            );
            calabash_assert_eq_simple!(std::cmp::min(odd_a.len() + odd_b.len(), c2), out2.len());

            let mut last = None;
            if c % 2 == 0 {
                let z1 = out1.pop().unwrap();
                let z2 = out2.pop().unwrap();
                let y = self.max_literal(z1, z2);
                if self.mode.emits_input_implies_output() {
                    self.add_clause(vec![!z1, y]);
                    self.add_clause(vec![!z2, y]);
                }
                if self.mode.emits_output_implies_input() {
                    self.add_clause(vec![!y, z1, z2]);
                }
                last = Some(y);
            }
            let mut out = self.interleave(&out1, &out2);
            if let Some(y) = last {
                out.push(y);
            }
            out
        };
        calabash_assert_eq_simple!(std::cmp::min(a.len() + b.len(), c), out.len());
        out
    }

    /// Direct encoding of the first `m` sorted outputs: each output is tied to the input subsets
    /// of the corresponding size.
    fn dsorting(&mut self, m: usize, xs: &[Literal]) -> Vec<Literal> {
        let n = xs.len();
        calabash_assert_simple!(m <= n);
        let out: Vec<Literal> = (0..m).map(|_| self.fresh()).collect();
        if self.mode.emits_input_implies_output() {
            for k in 1..=m {
                for subset in (0..n).combinations(k) {
                    let mut clause = vec![out[k - 1]];
                    clause.extend(subset.into_iter().map(|i| !xs[i]));
                    self.add_clause(clause);
                }
            }
        }
        if self.mode.emits_output_implies_input() {
            for k in 1..=m {
                for subset in (0..n).combinations(n - k + 1) {
                    let mut clause = vec![!out[k - 1]];
                    clause.extend(subset.into_iter().map(|i| xs[i]));
                    self.add_clause(clause);
                }
            }
        }
        out
    }

    /// Direct encoding of a truncated merge of two sorted sequences. The output-to-input
    /// direction emits, for every output position `k` and split `i + (k - i + 1)`, the clause
    /// `out[k-1] -> #a >= i \/ #b >= k-i+1`.
    fn dsmerge(&mut self, c: usize, a: &[Literal], b: &[Literal]) -> Vec<Literal> {
        calabash_assert_simple!(a.len() <= c && b.len() <= c && a.len() + b.len() >= c);
        let out: Vec<Literal> = (0..c).map(|_| self.fresh()).collect();
        if self.mode.emits_input_implies_output() {
            for i in 0..a.len() {
                self.add_clause(vec![!a[i], out[i]]);
            }
            for i in 0..b.len() {
                self.add_clause(vec![!b[i], out[i]]);
            }
            for i in 1..=a.len() {
                for j in 1..=b.len() {
                    if i + j > c {
                        break;
                    }
                    self.add_clause(vec![!a[i - 1], !b[j - 1], out[i + j - 1]]);
                }
            }
        }
        if self.mode.emits_output_implies_input() {
            for k in 1..=c {
                for i in 1..=k {
                    // out[k-1] -> #a >= i \/ #b >= k-i+1; an unreachable bound drops out of the
                    // disjunction, and both cannot drop since a + b > c.
                    let mut clause = vec![!out[k - 1]];
                    if i <= a.len() {
                        clause.push(a[i - 1]);
                    }
                    if k - i + 1 <= b.len() {
                        clause.push(b[k - i]);
                    }
                    calabash_assert_simple!(clause.len() > 1);
                    self.add_clause(clause);
                }
            }
        }
        out
    }

    /// Emits the clauses of a 2-comparator over `(x1, x2)` with outputs `(y1, y2)`,
    /// `y1 >= y2`, in the direction(s) the current mode requires.
    fn comparator(&mut self, x1: Literal, x2: Literal, y1: Literal, y2: Literal) {
        if self.mode.emits_output_implies_input() {
            self.add_clause(vec![!y2, x1]);
            self.add_clause(vec![!y2, x2]);
            self.add_clause(vec![!y1, x1, x2]);
        }
        if self.mode.emits_input_implies_output() {
            self.add_clause(vec![!x1, y1]);
            self.add_clause(vec![!x2, y1]);
            self.add_clause(vec![!x1, !x2, y2]);
        }
    }

    fn max_literal(&mut self, a: Literal, b: Literal) -> Literal {
        if a == b {
            return a;
        }
        self.fresh()
    }

    fn min_literal(&mut self, a: Literal, b: Literal) -> Literal {
        if a == b {
            return a;
        }
        self.fresh()
    }

    fn fresh(&mut self) -> Literal {
        self.num_variables += 1;
        Literal::new(self.context.create_new_propositional_variable(), true)
    }

    fn add_clause(&mut self, literals: Vec<Literal>) {
        self.num_clauses += 1;
        let _ = self.context.add_clause(literals);
    }
}

// The cost model. Every `use_*` decision compares the direct encoding against the recursive
// construction with the same estimate functions, so the chosen branch is never costlier than the
// rejected one under the model.
impl SortingNetwork<'_> {
    fn cost_comparator(&self) -> NetworkCost {
        let both =
            self.mode.emits_input_implies_output() && self.mode.emits_output_implies_input();
        NetworkCost::new(2, if both { 6 } else { 3 })
    }

    pub(crate) fn cost_card(&self, k: u64, n: u64) -> NetworkCost {
        if n <= k {
            self.cost_sorting(n)
        } else if self.use_dcard(k as usize, n as usize) {
            self.cost_dsorting(k, n)
        } else {
            self.cost_card_rec(k, n)
        }
    }

    pub(crate) fn cost_card_rec(&self, k: u64, n: u64) -> NetworkCost {
        let l = n / 2;
        self.cost_card(k, l) + self.cost_card(k, n - l) + self.cost_smerge(k, l, n - l)
    }

    fn use_dcard(&self, k: usize, n: usize) -> bool {
        n < 10
            && self
                .cost_dsorting(k as u64, n as u64)
                .cheaper_than(self.cost_card_rec(k as u64, n as u64))
    }

    fn cost_sorting(&self, n: u64) -> NetworkCost {
        match n {
            0 | 1 => NetworkCost::new(0, 0),
            2 => self.cost_merge(1, 1),
            _ => {
                if self.use_dsorting(n as usize) {
                    self.cost_dsorting(n, n)
                } else {
                    self.cost_sorting_rec(n)
                }
            }
        }
    }

    pub(crate) fn cost_sorting_rec(&self, n: u64) -> NetworkCost {
        calabash_assert_simple!(n > 2);
        let l = n / 2;
        self.cost_sorting(l) + self.cost_sorting(n - l) + self.cost_merge(l, n - l)
    }

    pub(crate) fn use_dsorting(&self, n: usize) -> bool {
        calabash_assert_simple!(n > 2);
        n < 10
            && self
                .cost_dsorting(n as u64, n as u64)
                .cheaper_than(self.cost_sorting_rec(n as u64))
    }

    fn cost_merge(&self, a: u64, b: u64) -> NetworkCost {
        if a == 1 && b == 1 {
            self.cost_comparator()
        } else if a == 0 || b == 0 {
            NetworkCost::new(0, 0)
        } else if self.use_dsmerge(a as usize, b as usize, (a + b) as usize) {
            self.cost_dsmerge(a, b, a + b)
        } else {
            self.cost_merge_rec(a, b)
        }
    }

    fn cost_merge_rec(&self, a: u64, b: u64) -> NetworkCost {
        self.cost_merge(ceil2(a), ceil2(b))
            + self.cost_merge(floor2(a), floor2(b))
            + self.cost_interleave(ceil2(a) + ceil2(b), floor2(a) + floor2(b))
    }

    fn cost_interleave(&self, a: u64, b: u64) -> NetworkCost {
        self.cost_comparator()
            .scale(std::cmp::min(a.saturating_sub(1), b))
    }

    fn cost_smerge(&self, a: u64, b: u64, c: u64) -> NetworkCost {
        if a == 1 && b == 1 && c == 1 {
            let mut cost = NetworkCost::new(1, 0);
            if self.mode.emits_input_implies_output() {
                cost = cost + NetworkCost::new(0, 2);
            }
            if self.mode.emits_output_implies_input() {
                cost = cost + NetworkCost::new(0, 1);
            }
            return cost;
        }
        if a == 0 || b == 0 {
            return NetworkCost::new(0, 0);
        }
        if a > c {
            return self.cost_smerge(c, b, c);
        }
        if b > c {
            return self.cost_smerge(a, c, c);
        }
        if a + b <= c {
            return self.cost_merge(a, b);
        }
        if self.use_dsmerge(a as usize, b as usize, c as usize) {
            return self.cost_dsmerge(a, b, c);
        }
        self.cost_smerge_rec(a, b, c)
    }

    pub(crate) fn cost_smerge_rec(&self, a: u64, b: u64, c: u64) -> NetworkCost {
        let (c1, c2) = if c % 2 == 0 {
            (1 + c / 2, c / 2)
        } else {
            ((c + 1) / 2, (c - 1) / 2)
        };
        let mut cost = self.cost_smerge(ceil2(a), ceil2(b), c1)
            + self.cost_smerge(floor2(a), floor2(b), c2)
            + self.cost_interleave(ceil2(a) + ceil2(b), floor2(a) + floor2(b))
            + NetworkCost::new(1, 0);
        if self.mode.emits_input_implies_output() {
            cost = cost + NetworkCost::new(0, 2);
        }
        if self.mode.emits_output_implies_input() {
            cost = cost + NetworkCost::new(0, 1);
        }
        cost
    }

    pub(crate) fn use_dsmerge(&self, a: usize, b: usize, c: usize) -> bool {
        a < (1 << 15)
            && b < (1 << 15)
            && self
                .cost_dsmerge(a as u64, b as u64, (a + b) as u64)
                .cheaper_than(self.cost_smerge_rec(a as u64, b as u64, c as u64))
    }

    pub(crate) fn cost_dsmerge(&self, a: u64, b: u64, c: u64) -> NetworkCost {
        let mut cost = NetworkCost::new(c, 0);
        let pairs = std::cmp::min(a, c) * std::cmp::min(b, c) / 2;
        if self.mode.emits_input_implies_output() {
            cost = cost + NetworkCost::new(0, a + b + pairs);
        }
        if self.mode.emits_output_implies_input() {
            cost = cost + NetworkCost::new(0, pairs);
        }
        cost
    }

    pub(crate) fn cost_dsorting(&self, m: u64, n: u64) -> NetworkCost {
        calabash_assert_simple!(m <= n && n < 10);
        let mut cost = NetworkCost::new(m, 0);
        if self.mode.emits_input_implies_output() {
            cost = cost + NetworkCost::new(0, power2(n - 1));
        }
        if self.mode.emits_output_implies_input() {
            cost = cost + NetworkCost::new(0, power2(n - 1));
        }
        cost
    }
}

fn split(xs: &[Literal]) -> (Vec<Literal>, Vec<Literal>) {
    let even = xs.iter().copied().step_by(2).collect();
    let odd = xs.iter().copied().skip(1).step_by(2).collect();
    (even, odd)
}

fn ceil2(n: u64) -> u64 {
    n / 2 + n % 2
}

fn floor2(n: u64) -> u64 {
    n / 2
}

fn power2(n: u64) -> u64 {
    calabash_assert_simple!(n < 10);
    1 << n
}
