//! The framebuffer model: cells, grids, rectangles.
//!
//! The terminal contract is a full grid of `(rune, fg, bg, attrs)` cells
//! rebuilt on every draw; no partial updates are assumed. Views render into
//! their own grids which the editor blits into one root grid and hands to
//! the terminal backend.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD    = 0b01;
        const REVERSE = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Cell {
    pub fn new(ch: char, fg: Color, bg: Color) -> Self {
        Self {
            ch,
            fg,
            bg,
            attrs: Attrs::empty(),
        }
    }

    pub fn with_attrs(ch: char, fg: Color, bg: Color, attrs: Attrs) -> Self {
        Self { ch, fg, bg, attrs }
    }

    pub fn blank() -> Self {
        Self::new(' ', Color::Default, Color::Default)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

/// A rectangle in cell coordinates. `x`/`y` are signed so preferred popup
/// placements may start off-screen before being clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: isize, y: isize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn intersection(self, other: Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width as isize).min(other.x + other.width as isize);
        let y2 = (self.y + self.height as isize).min(other.y + other.height as isize);
        if x2 <= x1 || y2 <= y1 {
            return Rect::new(x1, y1, 0, 0);
        }
        Rect::new(x1, y1, (x2 - x1) as usize, (y2 - y1) as usize)
    }
}

/// Choose a place for `pref` inside `win`: when the preferred rectangle
/// clips, consider the three mirrored placements (flipped X, flipped Y,
/// flipped both) and pick the one with the largest width, ties broken by
/// largest height.
pub fn find_place_for_rect(win: Rect, pref: Rect) -> Rect {
    let mut vars = [Rect::default(); 4];
    vars[0] = pref.intersection(win);
    if vars[0] == pref {
        return pref;
    }

    // invert X
    vars[1] = pref;
    vars[1].x = win.width as isize - pref.width as isize;
    vars[1] = vars[1].intersection(win);

    // invert Y
    vars[2] = pref;
    vars[2].y -= pref.height as isize + 1;
    vars[2] = vars[2].intersection(win);

    // invert X and Y
    vars[3] = pref;
    vars[3].x = win.width as isize - pref.width as isize;
    vars[3].y -= pref.height as isize + 1;
    vars[3] = vars[3].intersection(win);

    let optimal_w = vars.iter().map(|r| r.width).max().unwrap_or(0);
    let mut optimal_i = 0;
    let mut optimal_h = 0;
    for (i, r) in vars.iter().enumerate() {
        if r.width != optimal_w {
            continue;
        }
        if r.height > optimal_h {
            optimal_h = r.height;
            optimal_i = i;
        }
    }
    vars[optimal_i]
}

#[derive(Debug, Clone)]
pub struct CellGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::blank(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, Cell::blank());
    }

    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// Raw row-major access for the terminal backend.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let rect = rect.intersection(self.rect());
        for y in rect.y..rect.y + rect.height as isize {
            for x in rect.x..rect.x + rect.width as isize {
                self.cells[y as usize * self.width + x as usize] = cell;
            }
        }
    }

    /// Write `text` into `rect` one rune per cell with the given colors,
    /// clipping at the rectangle's right edge.
    pub fn draw_label(&mut self, rect: Rect, fg: Color, bg: Color, attrs: Attrs, text: &[u8]) {
        let rect = rect.intersection(self.rect());
        if rect.height == 0 {
            return;
        }
        let mut x = rect.x;
        let mut rest = text;
        while !rest.is_empty() && x < rect.x + rect.width as isize {
            let (r, rlen) = core_text::decode_rune(rest);
            rest = &rest[rlen.max(1)..];
            if x >= 0 {
                self.set(x as usize, rect.y as usize, Cell::with_attrs(r, fg, bg, attrs));
            }
            x += 1;
        }
    }

    /// Copy `src` into this grid with its top-left corner at `rect`,
    /// clipped to both `rect` and the source size.
    pub fn blit(&mut self, rect: Rect, src: &CellGrid) {
        let rect = rect.intersection(self.rect());
        let w = rect.width.min(src.width);
        let h = rect.height.min(src.height);
        for sy in 0..h {
            for sx in 0..w {
                let dx = rect.x as usize + sx;
                let dy = rect.y as usize + sy;
                self.cells[dy * self.width + dx] = src.get(sx, sy);
            }
        }
    }
}
