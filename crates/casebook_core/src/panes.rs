//! Side-by-side "Expected | Found" rendering for failing cases.
//!
//! Each line pair is cut or padded to [`PANE_WIDTH`] characters. Characters are compared position by
//! position; with colour enabled, matching cells get a green background and differing cells a red one.
//! Line pairs with at least one difference are joined by ` >> `, identical ones by ` || `.

/// Characters shown per pane.
pub const PANE_WIDTH: usize = 32;

/// ANSI sequences used by the renderer. [`Palette::PLAIN`] renders the same layout without escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub pane: &'static str,
    pub same: &'static str,
    pub differ: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub const PLAIN: Palette = Palette {
        pane: "",
        same: "",
        differ: "",
        reset: "",
    };

    pub const ANSI: Palette = Palette {
        pane: "\x1b[92m",
        same: "\x1b[30m\x1b[42m",
        differ: "\x1b[30m\x1b[41m",
        reset: "\x1b[0m",
    };

    pub fn new(color: bool) -> Self {
        if color { Self::ANSI } else { Self::PLAIN }
    }
}

/// Header/footer line framing the two panes.
pub fn pane_header() -> String {
    format!("|{:-^34}||{:-^34}|", " Expected ", " Found ")
}

/// Render one expected/found line pair. Returns the line and whether it differs.
pub fn render_line(expected: &str, found: &str, palette: &Palette) -> (String, bool) {
    let mut ex_cells = String::from(palette.pane);
    let mut fd_cells = String::from(palette.pane);
    let mut differs = false;

    let mut ex_chars = expected.chars();
    let mut fd_chars = found.chars();
    for _ in 0..PANE_WIDTH {
        let e = ex_chars.next().unwrap_or(' ');
        let f = fd_chars.next().unwrap_or(' ');
        if e == ' ' && f == ' ' {
            ex_cells.push(' ');
            fd_cells.push(' ');
            continue;
        }
        let cell = if e == f {
            palette.same
        } else {
            differs = true;
            palette.differ
        };
        ex_cells.push_str(cell);
        ex_cells.push(e);
        ex_cells.push_str(palette.reset);
        fd_cells.push_str(cell);
        fd_cells.push(f);
        fd_cells.push_str(palette.reset);
    }

    let joiner = if differs { " >> " } else { " || " };
    let line = format!("| {ex_cells}{reset}{joiner}{fd_cells}{reset} |", reset = palette.reset);
    (line, differs)
}

/// Render the full comparison block, framed by headers and followed by a blank line.
pub fn render(expected: &str, found: &str, palette: &Palette) -> String {
    let ex_lines: Vec<&str> = expected.split('\n').collect();
    let fd_lines: Vec<&str> = found.split('\n').collect();

    let mut out = String::new();
    out.push_str(&pane_header());
    out.push('\n');
    for k in 0..ex_lines.len().max(fd_lines.len()) {
        let e = ex_lines.get(k).copied().unwrap_or("");
        let f = fd_lines.get(k).copied().unwrap_or("");
        let (line, _) = render_line(e, f, palette);
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&pane_header());
    out.push_str("\n\n");
    out
}
