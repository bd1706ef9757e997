use ndarray::ArrayView1;

/// Squared Euclidean distance, the metric reported by every index.
#[must_use]
pub fn squared_l2(a: ArrayView1<'_, f32>, b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn identical_vectors_are_zero_apart() {
        let a = arr1(&[0.3_f32, -1.5, 2.0]);
        assert_eq!(squared_l2(a.view(), &[0.3, -1.5, 2.0]), 0.0);
    }

    #[test]
    fn distance_is_squared() {
        let a = arr1(&[0.0_f32, 0.0]);
        assert!((squared_l2(a.view(), &[3.0, 4.0]) - 25.0).abs() < 1e-6);
    }
}
