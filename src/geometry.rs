//! Render geometry calculations.
//!
//! Pure functions mapping source pixel dimensions and terminal cell
//! dimensions to a target render geometry. Cell transports fit the image
//! into the viewport preserving aspect ratio; SIXEL stretches to fill the
//! whole viewport in actual pixels.

/// Minimum render width in cells
pub const MIN_RENDER_WIDTH: u16 = 10;

/// Minimum render height in cells
pub const MIN_RENDER_HEIGHT: u16 = 5;

/// Rows reserved at the bottom for the status line
pub const STATUS_ROWS: u16 = 2;

/// A character cell is roughly twice as tall as it is wide
pub const CHAR_ASPECT: f64 = 2.0;

/// Horizontal pixels represented per cell in SIXEL mode
pub const SIXEL_PIXELS_PER_COL: u32 = 10;

/// Vertical pixels represented per cell in SIXEL mode.
/// 19 rather than 20 keeps the image inside the viewport so the terminal
/// never scrolls mid-frame.
pub const SIXEL_PIXELS_PER_ROW: u32 = 19;

/// Target render size in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub cols: u16,
    pub rows: u16,
}

/// Fit a source image into the terminal for cell-based transports.
///
/// Reserves two rows for the status line, fits to width first and falls
/// back to fitting to height, always staying within the clamped bounds.
pub fn cell_geometry(src_width: u32, src_height: u32, term_cols: u16, term_rows: u16) -> CellGeometry {
    let max_cols = term_cols.max(MIN_RENDER_WIDTH);
    let max_rows = term_rows
        .saturating_sub(STATUS_ROWS)
        .max(MIN_RENDER_HEIGHT);

    let aspect = if src_height == 0 {
        1.0
    } else {
        src_width as f64 / src_height as f64
    };

    let mut cols = max_cols;
    let mut rows = (cols as f64 / aspect / CHAR_ASPECT) as u16;

    if rows > max_rows {
        rows = max_rows;
        cols = (rows as f64 * aspect * CHAR_ASPECT) as u16;
    }

    CellGeometry {
        cols: cols.min(max_cols).max(MIN_RENDER_WIDTH),
        rows: rows.min(max_rows).max(MIN_RENDER_HEIGHT),
    }
}

/// Pixel dimensions the scaler must produce for the half-block encoder,
/// which packs two vertical pixels into every cell.
pub fn halfblock_pixel_target(geometry: CellGeometry) -> (u32, u32) {
    (geometry.cols as u32, geometry.rows as u32 * 2)
}

/// Pixel dimensions for SIXEL mode.
///
/// The image is stretched to the full viewport; height is rounded down to
/// a multiple of six because a sixel strip is six pixel rows tall.
pub fn sixel_pixel_target(term_cols: u16, term_rows: u16) -> (u32, u32) {
    let width = term_cols.max(1) as u32 * SIXEL_PIXELS_PER_COL;
    let height = (term_rows.max(1) as u32 * SIXEL_PIXELS_PER_ROW / 6 * 6).max(6);
    (width, height)
}

/// Resolution backoff for fast sources so the encode loop keeps up.
pub fn performance_scale(fps: f64) -> f64 {
    if fps > 50.0 {
        0.85
    } else if fps > 30.0 {
        0.90
    } else {
        1.0
    }
}

/// Apply the performance scale to a cell geometry, respecting minimums.
pub fn scaled_geometry(geometry: CellGeometry, factor: f64) -> CellGeometry {
    CellGeometry {
        cols: ((geometry.cols as f64 * factor) as u16).max(MIN_RENDER_WIDTH),
        rows: ((geometry.rows as f64 * factor) as u16).max(MIN_RENDER_HEIGHT),
    }
}
