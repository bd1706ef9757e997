use super::distance::squared_l2;
use ndarray::{Array2, ArrayView1, Axis};

pub(crate) const MAX_ITERATIONS: usize = 25;

/// Lloyd's k-means with a deterministic seed: the initial centroids are an
/// evenly spaced sample of the training rows, so training is reproducible.
///
/// Clusters that lose every member keep their previous centroid.
pub(crate) fn train(data: &Array2<f32>, nlist: usize) -> Array2<f32> {
    let n = data.nrows();
    let dim = data.ncols();
    let mut centroids = Array2::<f32>::zeros((nlist, dim));
    for c in 0..nlist {
        centroids.row_mut(c).assign(&data.row(c * n / nlist));
    }

    let mut assignment = vec![usize::MAX; n];
    for iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (row, vector) in data.outer_iter().enumerate() {
            let best = nearest_centroid(&centroids, vector);
            if assignment[row] != best {
                assignment[row] = best;
                changed = true;
            }
        }
        if !changed {
            log::debug!("k-means converged after {iteration} iterations");
            break;
        }

        let mut sums = Array2::<f32>::zeros((nlist, dim));
        let mut counts = vec![0usize; nlist];
        for (row, vector) in data.outer_iter().enumerate() {
            let cluster = assignment[row];
            let mut sum = sums.row_mut(cluster);
            sum += &vector;
            counts[cluster] += 1;
        }
        for (cluster, (mut centroid, sum)) in centroids
            .axis_iter_mut(Axis(0))
            .zip(sums.outer_iter())
            .enumerate()
        {
            let count = counts[cluster];
            if count > 0 {
                centroid.assign(&sum.mapv(|v| v / count as f32));
            }
        }
    }
    centroids
}

/// Index of the closest centroid; ties go to the lower index.
pub(crate) fn nearest_centroid(centroids: &Array2<f32>, vector: ArrayView1<'_, f32>) -> usize {
    let query = vector.to_vec();
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (cluster, centroid) in centroids.outer_iter().enumerate() {
        let distance = squared_l2(centroid, &query);
        if distance < best_distance {
            best = cluster;
            best_distance = distance;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn separates_two_obvious_groups() {
        let data = arr2(&[
            [0.0_f32, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]);
        let centroids = train(&data, 2);
        let a = nearest_centroid(&centroids, data.row(0));
        let b = nearest_centroid(&centroids, data.row(3));
        assert_ne!(a, b);
        for row in 0..3 {
            assert_eq!(nearest_centroid(&centroids, data.row(row)), a);
        }
        for row in 3..6 {
            assert_eq!(nearest_centroid(&centroids, data.row(row)), b);
        }
    }

    #[test]
    fn training_is_deterministic() {
        let data = Array2::from_shape_fn((30, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f32);
        assert_eq!(train(&data, 3), train(&data, 3));
    }
}
