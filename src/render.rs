use crate::grid::Grid;

/// Hex values of braille dots
///
/// ```text
///  1   8
///  2  10
///  4  20
/// 40  80
/// ```
///
/// Where the base blank pattern is codepoint `0x2800` (or U+2800)
///
/// To get other configurations, just add the numbers above.
const BRAILLE_EMPTY: u32 = 0x2800;

/// Draws grids as text, one braille dot per cell. Any state other than `0` is drawn as a dot.
///
/// A braille character holds a 2x4 block of cells, so a `w x h` canvas renders to
/// `ceil(w / 2) x ceil(h / 4)` characters.
pub struct Canvas {
    /// The cell buffer
    cb: Vec<bool>,

    /// The frame buffer.
    fb: String,

    /// Codepoints. This allows us to construct the framebuffer more easily
    cp: Vec<u32>,

    /// Width of the canvas, in cells
    w: usize,

    /// Height of the canvas, in cells
    h: usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        let (bw, bh) = (w.div_ceil(2), h.div_ceil(4));

        // Each braille character is 3 bytes, and newlines one byte
        let fb = String::with_capacity(3 * (bw * bh) + bh);

        Self {
            cb: vec![false; w * h],
            fb,
            cp: vec![BRAILLE_EMPTY; bw * bh],
            w,
            h,
        }
    }

    /// A canvas exactly large enough for `grid`.
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.cols(), grid.rows())
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    /// Reset the cell buffer
    pub fn reset(&mut self) {
        self.cb.fill(false);
    }

    /// Draw the live cells of `grid`, anchored at the top left. Whatever doesn't fit is clipped.
    pub fn draw(&mut self, grid: &Grid) {
        for (y, row) in grid.iter_rows().take(self.h).enumerate() {
            for (x, &state) in row.iter().take(self.w).enumerate() {
                if state != 0 {
                    let i = self.xy_from(x, y);
                    self.cb[i] = true;
                }
            }
        }
    }

    /// Turn the cell buffer into braille text, one line per 4 rows of cells.
    pub fn render(&mut self) -> &str {
        let bw = self.w.div_ceil(2);

        // compute new codepoints
        self.cp.fill(BRAILLE_EMPTY);

        for (n, &px) in self.cb.iter().enumerate() {
            if px {
                let (x, y) = self.xy_to(n);
                self.cp[(y / 4) * bw + (x / 2)] += Self::get_hex_value(x, y);
            }
        }

        // update framebuffer
        self.fb.clear();

        for (i, &c) in self.cp.iter().enumerate() {
            if i > 0 && i % bw == 0 {
                self.fb.push('\n');
            }

            // every codepoint is within the braille block
            self.fb.push(char::from_u32(c).unwrap_or(' '));
        }
        self.fb.push('\n');

        &self.fb
    }

    fn xy_to(&self, n: usize) -> (usize, usize) {
        (n % self.w, n / self.w)
    }

    fn xy_from(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    fn get_hex_value(x: usize, y: usize) -> u32 {
        match (x % 2, y % 4) {
            (0, 0) => 0x1,
            (1, 0) => 0x8,
            (0, 1) => 0x2,
            (1, 1) => 0x10,
            (0, 2) => 0x4,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => unreachable!(),
        }
    }
}

/// Render a single grid to braille text.
pub fn to_braille(grid: &Grid) -> String {
    let mut canvas = Canvas::for_grid(grid);
    canvas.draw(grid);

    canvas.render().to_owned()
}
