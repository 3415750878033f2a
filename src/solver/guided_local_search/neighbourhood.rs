use std::time::Instant;

use crate::config::constant::MAX_SEGMENT_LEN;

const EPS: f64 = 1e-9;

/// Local moves over per-vehicle stop sequences (depot excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Reverse `route[i..=j]`.
    TwoOpt { route: usize, i: usize, j: usize },
    /// Cut `len` stops starting at `start` out of `from` and insert them,
    /// in order, at `position` of `to` (positions refer to `to` after the cut).
    OrOpt {
        from: usize,
        start: usize,
        len: usize,
        to: usize,
        position: usize,
    },
    /// Swap the tails of two routes after `cut_a` and `cut_b` stops.
    TailExchange {
        a: usize,
        b: usize,
        cut_a: usize,
        cut_b: usize,
    },
}

fn pred(route: &[usize], k: usize, depot: usize) -> usize {
    if k == 0 {
        depot
    } else {
        route[k - 1]
    }
}

fn succ(route: &[usize], k: usize, depot: usize) -> usize {
    if k + 1 == route.len() {
        depot
    } else {
        route[k + 1]
    }
}

/// Stop at index `k` of `route` once `route[start..start + len]` is removed.
fn at_without(route: &[usize], start: usize, len: usize, k: usize) -> usize {
    if k < start {
        route[k]
    } else {
        route[k + len]
    }
}

struct Best {
    delta: f64,
    mv: Option<Move>,
}

impl Best {
    fn consider(&mut self, delta: f64, mv: Move) {
        if delta < self.delta {
            self.delta = delta;
            self.mv = Some(mv);
        }
    }
}

/// Scan every 2-opt, or-opt and tail-exchange move and return the one that
/// lowers the cost the most, if any lowers it at all.
///
/// `symmetric` enables the constant-time 2-opt delta; otherwise the reversed
/// arcs inside the segment are re-priced.
pub fn best_move<F>(
    routes: &[Vec<usize>],
    depot: usize,
    symmetric: bool,
    arc: &F,
) -> Option<(f64, Move)>
where
    F: Fn(usize, usize) -> f64,
{
    let mut best = Best {
        delta: -EPS,
        mv: None,
    };

    two_opt_moves(routes, depot, symmetric, arc, &mut best);
    or_opt_moves(routes, depot, arc, &mut best);
    if routes.len() > 1 {
        tail_exchange_moves(routes, depot, arc, &mut best);
    }

    best.mv.map(|mv| (best.delta, mv))
}

fn two_opt_moves<F>(routes: &[Vec<usize>], depot: usize, symmetric: bool, arc: &F, best: &mut Best)
where
    F: Fn(usize, usize) -> f64,
{
    for (r, route) in routes.iter().enumerate() {
        let m = route.len();
        for i in 0..m {
            let p = pred(route, i, depot);
            let mut reversed = 0.0;
            for j in (i + 1)..m {
                if !symmetric {
                    reversed += arc(route[j], route[j - 1]) - arc(route[j - 1], route[j]);
                }
                let s = succ(route, j, depot);
                let delta = arc(p, route[j]) + arc(route[i], s)
                    - arc(p, route[i])
                    - arc(route[j], s)
                    + reversed;
                best.consider(delta, Move::TwoOpt { route: r, i, j });
            }
        }
    }
}

fn or_opt_moves<F>(routes: &[Vec<usize>], depot: usize, arc: &F, best: &mut Best)
where
    F: Fn(usize, usize) -> f64,
{
    for (from, route) in routes.iter().enumerate() {
        let m = route.len();
        for len in 1..=MAX_SEGMENT_LEN.min(m) {
            for start in 0..=(m - len) {
                let first = route[start];
                let last = route[start + len - 1];
                let p = pred(route, start, depot);
                let s = succ(route, start + len - 1, depot);
                let removal = arc(p, s) - arc(p, first) - arc(last, s);

                for (to, target) in routes.iter().enumerate() {
                    if to == from {
                        let reduced = m - len;
                        for position in 0..=reduced {
                            if position == start {
                                continue;
                            }
                            let x = if position == 0 {
                                depot
                            } else {
                                at_without(route, start, len, position - 1)
                            };
                            let y = if position == reduced {
                                depot
                            } else {
                                at_without(route, start, len, position)
                            };
                            let delta = removal + arc(x, first) + arc(last, y) - arc(x, y);
                            best.consider(
                                delta,
                                Move::OrOpt {
                                    from,
                                    start,
                                    len,
                                    to,
                                    position,
                                },
                            );
                        }
                    } else {
                        for position in 0..=target.len() {
                            let x = if position == 0 {
                                depot
                            } else {
                                target[position - 1]
                            };
                            let y = if position == target.len() {
                                depot
                            } else {
                                target[position]
                            };
                            let delta = removal + arc(x, first) + arc(last, y) - arc(x, y);
                            best.consider(
                                delta,
                                Move::OrOpt {
                                    from,
                                    start,
                                    len,
                                    to,
                                    position,
                                },
                            );
                        }
                    }
                }
            }
        }
    }
}

fn tail_exchange_moves<F>(routes: &[Vec<usize>], depot: usize, arc: &F, best: &mut Best)
where
    F: Fn(usize, usize) -> f64,
{
    for a in 0..routes.len() {
        for b in (a + 1)..routes.len() {
            let (ra, rb) = (&routes[a], &routes[b]);
            for cut_a in 0..=ra.len() {
                let a_last = if cut_a == 0 { depot } else { ra[cut_a - 1] };
                let a_next = if cut_a == ra.len() { depot } else { ra[cut_a] };
                for cut_b in 0..=rb.len() {
                    let b_last = if cut_b == 0 { depot } else { rb[cut_b - 1] };
                    let b_next = if cut_b == rb.len() { depot } else { rb[cut_b] };
                    let delta = arc(a_last, b_next) + arc(b_last, a_next)
                        - arc(a_last, a_next)
                        - arc(b_last, b_next);
                    best.consider(
                        delta,
                        Move::TailExchange {
                            a,
                            b,
                            cut_a,
                            cut_b,
                        },
                    );
                }
            }
        }
    }
}

pub fn apply_move(routes: &mut [Vec<usize>], mv: Move) {
    match mv {
        Move::TwoOpt { route, i, j } => routes[route][i..=j].reverse(),
        Move::OrOpt {
            from,
            start,
            len,
            to,
            position,
        } => {
            let segment: Vec<usize> = routes[from].drain(start..start + len).collect();
            routes[to].splice(position..position, segment);
        }
        Move::TailExchange { a, b, cut_a, cut_b } => {
            let (left, right) = routes.split_at_mut(b);
            let (ra, rb) = (&mut left[a], &mut right[0]);
            let tail_a = ra.split_off(cut_a);
            let tail_b = rb.split_off(cut_b);
            ra.extend(tail_b);
            rb.extend(tail_a);
        }
    }
}

/// Apply best-improvement moves until none improves or `deadline` passes.
/// Returns the number of moves applied.
pub fn local_search<F>(
    routes: &mut [Vec<usize>],
    depot: usize,
    symmetric: bool,
    arc: &F,
    deadline: Instant,
) -> usize
where
    F: Fn(usize, usize) -> f64,
{
    let mut applied = 0;
    while Instant::now() < deadline {
        match best_move(routes, depot, symmetric, arc) {
            Some((_, mv)) => {
                apply_move(routes, mv);
                applied += 1;
            }
            None => break,
        }
    }
    applied
}
