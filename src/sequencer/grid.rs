use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub active: bool,
    pub probability: u8, // percent, 100 = always fires
}

impl Default for Cell {
    fn default() -> Self {
        Self { active: false, probability: 100 }
    }
}

/// `tracks × steps` matrix of cells. Rows are tracks, columns are steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepGrid {
    steps: usize,
    rows: Vec<Vec<Cell>>,
}

impl StepGrid {
    pub fn new(tracks: usize, steps: usize) -> Self {
        let steps = steps.max(1);
        Self {
            steps,
            rows: vec![vec![Cell::default(); steps]; tracks],
        }
    }

    pub fn tracks(&self) -> usize {
        self.rows.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn cell(&self, track: usize, step: usize) -> Option<Cell> {
        self.rows.get(track).and_then(|r| r.get(step)).copied()
    }

    fn cell_mut(&mut self, track: usize, step: usize) -> Option<&mut Cell> {
        self.rows.get_mut(track).and_then(|r| r.get_mut(step))
    }

    pub fn is_active(&self, track: usize, step: usize) -> bool {
        self.cell(track, step).is_some_and(|c| c.active)
    }

    pub fn toggle(&mut self, track: usize, step: usize) {
        if let Some(c) = self.cell_mut(track, step) {
            c.active = !c.active;
        }
    }

    pub fn set_active(&mut self, track: usize, step: usize, active: bool) {
        if let Some(c) = self.cell_mut(track, step) {
            c.active = active;
        }
    }

    pub fn set_probability(&mut self, track: usize, step: usize, probability: u8) {
        if let Some(c) = self.cell_mut(track, step) {
            c.probability = probability.min(100);
        }
    }

    pub fn nudge_probability(&mut self, track: usize, step: usize, delta: i16) {
        if let Some(c) = self.cell_mut(track, step) {
            c.probability = (c.probability as i16 + delta).clamp(0, 100) as u8;
        }
    }

    pub fn clear_track(&mut self, track: usize) {
        if let Some(row) = self.rows.get_mut(track) {
            row.fill(Cell::default());
        }
    }

    pub fn row(&self, track: usize) -> Vec<bool> {
        self.rows
            .get(track)
            .map(|r| r.iter().map(|c| c.active).collect())
            .unwrap_or_default()
    }

    /// Write `pattern` into a track, repeating it until every step is covered.
    /// Probabilities are left alone.
    pub fn set_row(&mut self, track: usize, pattern: &[bool]) {
        if pattern.is_empty() {
            return;
        }
        if let Some(row) = self.rows.get_mut(track) {
            for (i, c) in row.iter_mut().enumerate() {
                c.active = pattern[i % pattern.len()];
            }
        }
    }

    pub fn resize_steps(&mut self, steps: usize) {
        self.steps = steps.max(1);
        for row in self.rows.iter_mut() {
            row.resize(self.steps, Cell::default());
        }
    }

    /// Change the loop length keeping each row's shape: the cell at step `s`
    /// moves to `s * steps / old_steps`. Cells landing on the same step keep
    /// the later one.
    pub fn rescale_steps(&mut self, steps: usize) {
        let old = self.steps;
        let steps = steps.max(1);
        for row in self.rows.iter_mut() {
            let mut scaled = vec![Cell::default(); steps];
            for (s, cell) in row.iter().enumerate().filter(|(_, c)| c.active) {
                if let Some(target) = scaled.get_mut(s * steps / old) {
                    *target = *cell;
                }
            }
            *row = scaled;
        }
        self.steps = steps;
    }

    pub fn add_track(&mut self) -> usize {
        self.rows.push(vec![Cell::default(); self.steps]);
        self.rows.len() - 1
    }

    pub fn set_tracks(&mut self, tracks: usize) {
        let steps = self.steps;
        self.rows.resize_with(tracks, || vec![Cell::default(); steps]);
    }

    /// Tracks with an active cell at `step`, with that cell.
    pub fn active_tracks_at(&self, step: usize) -> impl Iterator<Item = (usize, Cell)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(move |(t, row)| row.get(step).filter(|c| c.active).map(|c| (t, *c)))
    }
}
