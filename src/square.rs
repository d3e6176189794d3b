//! Squares, placement requests and placement events.
//!
//! A [`PlacementRequest`] is the client payload exactly as parsed. It only
//! becomes a [`Placement`] after [`PlacementRequest::validate`] checks it
//! against a [`CanvasLayout`]; the write path never sees unchecked input.

use serde::{Deserialize, Serialize};

use crate::canvas::CanvasLayout;
use crate::error::{PlaceError, PlaceResult};

/// Exclusive upper bound for a color code. Colors fit in four bits.
pub const COLOR_LIMIT: i64 = 16;

/// One colored cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub x: u32,
    pub y: u32,
    pub color: u8,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Square {
    /// The square reported for a coordinate nobody has painted yet.
    pub fn blank(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            color: 0,
            author: String::new(),
            timestamp: 0,
        }
    }
}

/// PUT body as sent by the client.
///
/// Numbers are kept signed and wide so that `color: -1` or a huge `x` is a
/// validation failure rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub x: i64,
    pub y: i64,
    pub color: i64,
    #[serde(default)]
    pub author: String,
}

impl PlacementRequest {
    /// Check the request against the canvas bounds and the color range.
    pub fn validate(&self, layout: &CanvasLayout) -> PlaceResult<Placement> {
        let author = self.author.trim();
        if author.is_empty() {
            return Err(PlaceError::invalid("author is required"));
        }

        let color_limit = COLOR_LIMIT.min(layout.color_limit());
        if !(0..color_limit).contains(&self.color) {
            return Err(PlaceError::invalid(format!(
                "color must be in 0..{color_limit}, got {}",
                self.color
            )));
        }

        let size = i64::from(layout.size());
        if !(0..size).contains(&self.x) || !(0..size).contains(&self.y) {
            return Err(PlaceError::invalid(format!(
                "invalid coordinate ({},{}) for a {size}x{size} canvas",
                self.x, self.y
            )));
        }

        Ok(Placement {
            x: self.x as u32,
            y: self.y as u32,
            color: self.color as u8,
            author: author.to_string(),
        })
    }
}

/// A validated placement, ready for the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub color: u8,
    pub author: String,
}

impl Placement {
    pub fn into_square(self, timestamp: i64) -> Square {
        Square {
            x: self.x,
            y: self.y,
            color: self.color,
            author: self.author,
            timestamp,
        }
    }
}

/// Append-only record of "author placed a square at time T".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementEvent {
    pub author: String,
    pub timestamp: i64,
}

/// What a successful placement reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementReceipt {
    pub author: String,
    pub color: u8,
    pub x: u32,
    pub y: u32,
    pub timestamp: i64,
}

impl PlacementReceipt {
    pub fn message(&self) -> String {
        format!(
            "user {} successfully inserted color {} at pos ({},{})",
            self.author, self.color, self.x, self.y
        )
    }
}

impl From<&Square> for PlacementReceipt {
    fn from(square: &Square) -> Self {
        Self {
            author: square.author.clone(),
            color: square.color,
            x: square.x,
            y: square.y,
            timestamp: square.timestamp,
        }
    }
}
