//! Rolling-window assembly of feature rows into model input sequences.

/// Cuts overlapping fixed-length windows out of a feature row series.
pub struct SequenceWindower {
    length: usize,
}

impl SequenceWindower {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// All overlapping windows with their aligned targets, for training.
    ///
    /// Window `i` covers rows `[i, i+L)` and is paired with the target of
    /// its last row, `targets[i+L-1]`; the horizon shift already happened
    /// upstream in target construction. Fewer than `L` rows is a normal
    /// boundary and yields empty outputs.
    pub fn windows(
        &self,
        rows: &[Vec<f64>],
        targets: &[f64],
    ) -> (Vec<Vec<Vec<f64>>>, Vec<f64>) {
        debug_assert_eq!(rows.len(), targets.len());
        if rows.len() < self.length {
            return (Vec::new(), Vec::new());
        }

        let count = rows.len() - self.length;
        let mut sequences = Vec::with_capacity(count);
        let mut aligned = Vec::with_capacity(count);
        for i in 0..count {
            sequences.push(rows[i..i + self.length].to_vec());
            aligned.push(targets[i + self.length - 1]);
        }
        (sequences, aligned)
    }

    /// The most recent window, for live inference. `None` when fewer than
    /// `L` rows exist.
    pub fn latest(&self, rows: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
        if rows.len() < self.length {
            return None;
        }
        Some(rows[rows.len() - self.length..].to_vec())
    }
}
