use deck_live_core::avatar::{AvatarCanvas, AvatarLayout, FrameState, Rect};

const HEAD: char = '·';
const EYE: char = '●';
const MOUTH: char = '▬';

/// Character-cell avatar renderer. Cells are twice as tall as wide, so the
/// canvas reports double its row count as height.
pub struct TerminalCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<char>>,
}

impl TerminalCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![vec![' '; cols]; rows],
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells.iter().map(|row| row.iter().collect()).collect()
    }

    pub fn count(&self, c: char) -> usize {
        self.cells.iter().flatten().filter(|cell| **cell == c).count()
    }

    fn cell_center(&self, col: usize, row: usize) -> (f32, f32) {
        (col as f32 + 0.5, (row as f32 + 0.5) * 2.0)
    }

    fn fill_rect(&mut self, rect: &Rect, c: char) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let (x, y) = self.cell_center(col, row);
                if x >= rect.x
                    && x <= rect.x + rect.width
                    && y >= rect.y - 1.0
                    && y <= rect.y + rect.height + 1.0
                {
                    self.cells[row][col] = c;
                }
            }
        }
    }
}

impl AvatarCanvas for TerminalCanvas {
    fn size(&self) -> (f32, f32) {
        (self.cols as f32, self.rows as f32 * 2.0)
    }

    fn draw(&mut self, layout: &AvatarLayout, _state: &FrameState) {
        self.cells = vec![vec![' '; self.cols]; self.rows];

        let (cx, cy) = layout.center;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let (x, y) = self.cell_center(col, row);
                let distance = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                if (distance - layout.radius).abs() < 1.0 {
                    self.cells[row][col] = HEAD;
                }
            }
        }
        self.fill_rect(&layout.left_eye, EYE);
        self.fill_rect(&layout.right_eye, EYE);
        self.fill_rect(&layout.mouth, MOUTH);
    }
}
