/// A dense, row-major grid of intensities. Rows are time bins, columns are
/// m/z bins with the highest m/z in column 0.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntensityGrid {
    rows: usize,
    columns: usize,
    data: Vec<f32>,
}

impl IntensityGrid {
    /// Create a zero-filled grid
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            data: vec![0.0; rows * columns],
        }
    }

    /// `(rows, columns)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.data.get(row * self.columns + column).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.data[start..start + self.columns])
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&mut self.data[start..start + self.columns])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // `chunks_exact(0)` panics, an empty grid simply has no rows to yield
        self.data.chunks_exact(self.columns.max(1)).take(self.rows)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The sum of every cell
    pub fn total(&self) -> f64 {
        self.data.iter().map(|v| *v as f64).sum()
    }

    /// The largest cell value, `0.0` for an empty grid
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Add `values`, indexed by ascending m/z bin, into `row` with the m/z axis
    /// reversed so that bin `j` lands in column `columns - 1 - j`.
    ///
    /// Returns the largest resulting value among the touched cells, or `None` if
    /// `row` is out of bounds. Extra values beyond the column count are ignored.
    pub fn accumulate_reversed(&mut self, row: usize, values: &[f32]) -> Option<f32> {
        let cells = self.row_mut(row)?;
        let mut max = 0.0f32;
        for (cell, value) in cells.iter_mut().rev().zip(values.iter().copied()) {
            *cell += value;
            max = max.max(*cell);
        }
        Some(max)
    }
}
