//! Conversion between on-screen pixels and board squares.
//!
//! Rank 1 is drawn at the bottom, so rows are counted from the bottom edge.

use crate::Square;

/// Bounding box of the rendered board, in the same coordinate space as pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoardRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        BoardRect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn square_width(&self) -> f32 {
        self.width / 8.0
    }

    pub fn square_height(&self) -> f32 {
        self.height / 8.0
    }

    /// right and bottom edges are outside
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left
            && y >= self.top
            && x < self.left + self.width
            && y < self.top + self.height
    }
}

impl Default for BoardRect {
    fn default() -> Self {
        BoardRect::new(0.0, 0.0, 480.0, 480.0)
    }
}

/// Maps a pointer position to the square under it, `None` when it is off the board.
pub fn pixel_to_square(x: f32, y: f32, rect: &BoardRect) -> Option<Square> {
    if rect.width <= 0.0 || rect.height <= 0.0 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    if !rect.contains(x, y) {
        return None;
    }

    let column = ((x - rect.left) / rect.square_width()).floor();
    // counted from the bottom edge; the top edge itself belongs to rank 8
    let row = 7.0 - ((y - rect.top) / rect.square_height()).floor();

    // float rounding at the edges can still land outside 0..8
    if !(0.0..8.0).contains(&column) || !(0.0..8.0).contains(&row) {
        return None;
    }
    Square::new(column as u8, row as u8)
}

/// Top left corner of `square` on screen.
pub fn square_origin(square: Square, rect: &BoardRect) -> (f32, f32) {
    let x = rect.left + square.file() as f32 * rect.square_width();
    let y = rect.top + (7 - square.rank()) as f32 * rect.square_height();
    (x, y)
}

pub fn square_center(square: Square, rect: &BoardRect) -> (f32, f32) {
    let (x, y) = square_origin(square, rect);
    (x + rect.square_width() / 2.0, y + rect.square_height() / 2.0)
}
