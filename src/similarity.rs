//! Pairwise content similarity for a candidate set

/// Added to every norm so all-zero vectors normalize to zero instead of NaN
const NORM_EPS: f64 = 1e-12;

/// L2-normalize each row
pub fn normalize_rows(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt() + NORM_EPS;
            row.iter().map(|x| x / norm).collect()
        })
        .collect()
}

/// Cosine similarity for embeddings (assumes unit-normalized vectors)
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Dense N×N cosine similarity matrix, row-major
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn from_embeddings(embeddings: &[Vec<f64>]) -> Self {
        let normed = normalize_rows(embeddings);
        let n = normed.len();
        let mut data = vec![0.0; n * n];

        for i in 0..n {
            for j in i..n {
                let s = cosine_similarity(&normed[i], &normed[j]);
                data[i * n + j] = s;
                data[j * n + i] = s;
            }
        }

        Self { n, data }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Highest similarity between `i` and any of `others` (0 when empty)
    pub fn max_sim_to(&self, i: usize, others: &[usize]) -> f64 {
        others
            .iter()
            .map(|&j| self.get(i, j))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector_stays_finite() {
        let normed = normalize_rows(&[vec![0.0; 12]]);
        assert!(normed[0].iter().all(|x| x.is_finite() && *x == 0.0));
    }

    #[test]
    fn test_max_sim_can_be_negative() {
        let m = SimilarityMatrix::from_embeddings(&[vec![1.0, 0.0], vec![-1.0, 0.0]]);
        assert!((m.max_sim_to(0, &[1]) + 1.0).abs() < 1e-5);
        assert_eq!(m.max_sim_to(0, &[]), 0.0);
    }
}
