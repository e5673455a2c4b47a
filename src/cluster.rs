//! Balanced-ish geographic partitioning for multi-vehicle routing.
//!
//! Bounded centroid relaxation: a fixed number of assign/update rounds with
//! no convergence check, seeded deterministically from evenly spaced input
//! points. Distances are Euclidean on raw degrees.

use crate::stop::Coordinate;

/// Assign/update rounds before the final assignment.
pub const CLUSTER_ITERATIONS: usize = 10;

/// Splits `points` into `k` groups of point indices (`k` clamped to
/// `[1, points.len()]`). Groups may be empty; every index appears in exactly
/// one group, in ascending order.
pub fn partition(points: &[Coordinate], k: usize) -> Vec<Vec<usize>> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);

    let mut centroids: Vec<Coordinate> = seed_indices(n, k).map(|i| points[i]).collect();

    for _ in 0..CLUSTER_ITERATIONS {
        let assignment = assign(points, &centroids);
        let mut sums = vec![(0.0, 0.0, 0usize); k];
        for (point, &cluster) in points.iter().zip(&assignment) {
            let sum = &mut sums[cluster];
            sum.0 += point.0;
            sum.1 += point.1;
            sum.2 += 1;
        }
        for (centroid, (lat_sum, lng_sum, count)) in centroids.iter_mut().zip(sums) {
            if count > 0 {
                *centroid = (lat_sum / count as f64, lng_sum / count as f64);
            }
        }
    }

    let mut groups = vec![Vec::new(); k];
    for (index, cluster) in assign(points, &centroids).into_iter().enumerate() {
        groups[cluster].push(index);
    }
    groups
}

/// `k` evenly spaced indices over `0..n`, truncated toward zero.
fn seed_indices(n: usize, k: usize) -> impl Iterator<Item = usize> {
    (0..k).map(move |i| {
        if k == 1 {
            0
        } else {
            ((i as f64) * ((n - 1) as f64) / ((k - 1) as f64)) as usize
        }
    })
}

/// Index of the nearest centroid for every point; ties go to the lower index.
fn assign(points: &[Coordinate], centroids: &[Coordinate]) -> Vec<usize> {
    points
        .iter()
        .map(|&(lat, lng)| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (index, &(c_lat, c_lng)) in centroids.iter().enumerate() {
                let distance = ((lat - c_lat).powi(2) + (lng - c_lng).powi(2)).sqrt();
                if distance < best_distance {
                    best = index;
                    best_distance = distance;
                }
            }
            best
        })
        .collect()
}
