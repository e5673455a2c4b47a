//! Built-in guided local search VRP backend.
//!
//! Parallel cheapest-arc construction followed by relocate and 2-opt local
//! search under arc penalties. Each worker runs an independent search with
//! its own penalty weight; the cheapest result wins. Arc costs are integral
//! metres.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use crate::matrix::DistanceMatrix;
use crate::tour::Tour;
use crate::traits::{BackendOutcome, SolverBackend};

const EPSILON: f64 = 1e-9;

/// Minimum search budget.
pub const MIN_BUDGET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct GuidedLocalSearch {
    /// Independent search workers run in parallel.
    pub workers: usize,
    /// Penalty rounds per worker before stopping early.
    pub max_rounds: usize,
}

impl Default for GuidedLocalSearch {
    fn default() -> Self {
        Self {
            workers: 8,
            max_rounds: 500,
        }
    }
}

impl GuidedLocalSearch {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }
}

impl SolverBackend for GuidedLocalSearch {
    fn name(&self) -> &'static str {
        "guided_local_search"
    }

    fn solve(
        &self,
        matrix: &DistanceMatrix,
        vehicles: usize,
        depot: usize,
        budget: Duration,
    ) -> BackendOutcome {
        let n = matrix.len();
        if n == 0 || vehicles == 0 || depot >= n {
            return BackendOutcome::NoAssignment;
        }
        let vehicles = vehicles.min(n);

        let deadline = Instant::now() + budget.max(MIN_BUDGET);
        let problem = Problem {
            n,
            depot,
            vehicles,
            costs: matrix.scaled_costs(),
            symmetric: matrix.is_symmetric(),
        };

        let results: Vec<Option<(i64, Vec<Vec<usize>>)>> = (0..self.workers.max(1))
            .into_par_iter()
            .map(|worker| Search::new(&problem, worker).run(self.max_rounds, deadline))
            .collect();

        // First worker wins ties so repeated runs agree when no deadline hits.
        let mut best: Option<(i64, Vec<Vec<usize>>)> = None;
        for (worker, result) in results.into_iter().enumerate() {
            let Some((cost, routes)) = result else {
                debug!(worker, "guided local search worker ran out of time constructing");
                continue;
            };
            debug!(worker, cost_m = cost, "guided local search worker finished");
            if best.as_ref().is_none_or(|(best_cost, _)| cost < *best_cost) {
                best = Some((cost, routes));
            }
        }

        match best {
            Some((_, routes)) => BackendOutcome::Solved(
                routes
                    .into_iter()
                    .map(|route| {
                        let mut indices = Vec::with_capacity(route.len() + 2);
                        indices.push(depot);
                        indices.extend(route);
                        indices.push(depot);
                        Tour::new(indices)
                    })
                    .collect(),
            ),
            None => BackendOutcome::NoAssignment,
        }
    }
}

struct Problem {
    n: usize,
    depot: usize,
    vehicles: usize,
    costs: Vec<i64>,
    symmetric: bool,
}

impl Problem {
    fn cost(&self, from: usize, to: usize) -> i64 {
        self.costs[from * self.n + to]
    }
}

/// One worker's search state. Routes hold customers only; the depot is
/// implicit at both ends.
struct Search<'a> {
    problem: &'a Problem,
    routes: Vec<Vec<usize>>,
    penalties: Vec<u32>,
    lambda: f64,
    alpha: f64,
    first_vehicle: usize,
}

impl<'a> Search<'a> {
    fn new(problem: &'a Problem, worker: usize) -> Self {
        Self {
            problem,
            routes: vec![Vec::new(); problem.vehicles],
            penalties: vec![0; problem.n * problem.n],
            lambda: 0.0,
            alpha: 0.1 + 0.05 * worker as f64,
            first_vehicle: worker % problem.vehicles,
        }
    }

    /// `None` when the deadline passes before every customer is routed.
    fn run(mut self, max_rounds: usize, deadline: Instant) -> Option<(i64, Vec<Vec<usize>>)> {
        if !self.construct(deadline) {
            return None;
        }
        self.local_search(deadline);

        let mut best_cost = self.total_cost();
        let mut best = self.routes.clone();
        let arcs = (self.problem.n - 1 + self.problem.vehicles) as f64;
        self.lambda = self.alpha * best_cost as f64 / arcs;
        if self.lambda <= 0.0 {
            return Some((best_cost, best));
        }

        for _ in 0..max_rounds {
            if Instant::now() >= deadline || !self.penalize() {
                break;
            }
            self.local_search(deadline);
            let cost = self.total_cost();
            if cost < best_cost {
                best_cost = cost;
                best = self.routes.clone();
            }
        }

        Some((best_cost, best))
    }

    fn augmented(&self, from: usize, to: usize) -> f64 {
        self.problem.cost(from, to) as f64
            + self.lambda * self.penalties[from * self.problem.n + to] as f64
    }

    /// Node at `pos` in the full `[depot, route.., depot]` sequence of
    /// `route`, optionally with the customer at `skip` removed.
    fn node_at(&self, route: &[usize], pos: usize, skip: Option<usize>) -> usize {
        let len = route.len() - usize::from(skip.is_some());
        if pos == 0 || pos == len + 1 {
            return self.problem.depot;
        }
        let index = pos - 1;
        match skip {
            Some(skip) if index >= skip => route[index + 1],
            _ => route[index],
        }
    }

    fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let depot = self.problem.depot;
        self.routes.iter().filter(|r| !r.is_empty()).flat_map(move |route| {
            std::iter::once(depot)
                .chain(route.iter().copied())
                .zip(route.iter().copied().chain(std::iter::once(depot)))
        })
    }

    fn total_cost(&self) -> i64 {
        self.arcs().map(|(a, b)| self.problem.cost(a, b)).sum()
    }

    /// Repeatedly appends the globally cheapest arc from any route end to an
    /// unassigned customer. Returns false if `deadline` passes first.
    fn construct(&mut self, deadline: Instant) -> bool {
        let problem = self.problem;
        let mut assigned = vec![false; problem.n];
        assigned[problem.depot] = true;
        let mut ends = vec![problem.depot; problem.vehicles];

        for _ in 1..problem.n {
            if Instant::now() >= deadline {
                return false;
            }
            let mut best: Option<(usize, usize, i64)> = None;
            let mut depot_scanned = false;
            for offset in 0..problem.vehicles {
                let vehicle = (self.first_vehicle + offset) % problem.vehicles;
                let from = ends[vehicle];
                // Idle vehicles all start at the depot; only the first can win.
                if from == problem.depot {
                    if depot_scanned {
                        continue;
                    }
                    depot_scanned = true;
                }
                for to in (0..problem.n).filter(|&to| !assigned[to]) {
                    let cost = problem.cost(from, to);
                    if best.is_none_or(|(_, _, best_cost)| cost < best_cost) {
                        best = Some((vehicle, to, cost));
                    }
                }
            }
            let Some((vehicle, to, _)) = best else { break };
            assigned[to] = true;
            ends[vehicle] = to;
            self.routes[vehicle].push(to);
        }
        true
    }

    fn local_search(&mut self, deadline: Instant) {
        loop {
            if Instant::now() >= deadline {
                return;
            }
            let improved = self.relocate() || (self.problem.symmetric && self.two_opt());
            if !improved {
                return;
            }
        }
    }

    /// Moves one customer to its best improving slot. First improvement.
    fn relocate(&mut self) -> bool {
        for from_route in 0..self.routes.len() {
            for position in 0..self.routes[from_route].len() {
                let route = &self.routes[from_route];
                let customer = route[position];
                let prev = self.node_at(route, position, None);
                let next = self.node_at(route, position + 2, None);
                let removal_gain = self.augmented(prev, customer) + self.augmented(customer, next)
                    - self.augmented(prev, next);

                for to_route in 0..self.routes.len() {
                    let target = &self.routes[to_route];
                    let same = to_route == from_route;
                    let skip = same.then_some(position);
                    let slots = target.len() - usize::from(same);

                    for slot in 0..=slots {
                        if same && slot == position {
                            continue;
                        }
                        let u = self.node_at(target, slot, skip);
                        let v = self.node_at(target, slot + 1, skip);
                        let insertion = self.augmented(u, customer) + self.augmented(customer, v)
                            - self.augmented(u, v);

                        if insertion - removal_gain < -EPSILON {
                            self.routes[from_route].remove(position);
                            self.routes[to_route].insert(slot, customer);
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// Reverses a segment within one route. Only valid for symmetric costs.
    fn two_opt(&mut self) -> bool {
        for route_index in 0..self.routes.len() {
            let route = &self.routes[route_index];
            let full_len = route.len() + 2;
            if route.len() < 2 {
                continue;
            }
            for i in 0..full_len - 3 {
                for j in i + 2..full_len - 1 {
                    let a = self.node_at(route, i, None);
                    let b = self.node_at(route, i + 1, None);
                    let c = self.node_at(route, j, None);
                    let d = self.node_at(route, j + 1, None);
                    let delta = self.augmented(a, c) + self.augmented(b, d)
                        - self.augmented(a, b)
                        - self.augmented(c, d);
                    if delta < -EPSILON {
                        self.routes[route_index][i..j].reverse();
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Penalises the solution arcs with maximum utility. Returns false when
    /// no arc has positive utility.
    fn penalize(&mut self) -> bool {
        let n = self.problem.n;
        let mut max_utility = 0.0;
        let mut chosen: Vec<(usize, usize)> = Vec::new();
        for (a, b) in self.arcs() {
            let utility = self.problem.cost(a, b) as f64 / (1.0 + self.penalties[a * n + b] as f64);
            if utility > max_utility + EPSILON {
                max_utility = utility;
                chosen.clear();
                chosen.push((a, b));
            } else if (utility - max_utility).abs() <= EPSILON && utility > 0.0 {
                chosen.push((a, b));
            }
        }
        if chosen.is_empty() {
            return false;
        }
        for (a, b) in chosen {
            self.penalties[a * n + b] += 1;
            if self.problem.symmetric && a != b {
                self.penalties[b * n + a] += 1;
            }
        }
        true
    }
}
