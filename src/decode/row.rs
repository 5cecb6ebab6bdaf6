use crate::foundation::core::{Channel, ChannelSet};

/// One scanline of linear-light float pixels.
///
/// Covers columns `left..right` of row `y` (row 0 is the bottom of the image) and holds one plane
/// per requested channel. Planes for channels outside the set are empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    y: i32,
    left: i32,
    right: i32,
    channels: ChannelSet,
    planes: [Vec<f32>; 4],
}

impl Row {
    /// Allocate a zeroed row.
    pub fn new(y: i32, left: i32, right: i32, channels: ChannelSet) -> Self {
        let width = usize::try_from(right.saturating_sub(left)).unwrap_or(0);
        let planes = std::array::from_fn(|i| {
            if channels.contains(Channel::ALL[i]) {
                vec![0.0; width]
            } else {
                Vec::new()
            }
        });
        Self {
            y,
            left,
            right,
            channels,
            planes,
        }
    }

    /// Row index.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Retarget this buffer to row `y` without reallocating. Pixel values are zeroed.
    pub fn set_y(&mut self, y: i32) {
        self.y = y;
        for plane in &mut self.planes {
            plane.fill(0.0);
        }
    }

    /// First column.
    pub fn left(&self) -> i32 {
        self.left
    }

    /// One past the last column.
    pub fn right(&self) -> i32 {
        self.right
    }

    /// Number of pixels in the row.
    pub fn width(&self) -> usize {
        usize::try_from(self.right.saturating_sub(self.left)).unwrap_or(0)
    }

    /// Channels this row carries.
    pub fn channels(&self) -> ChannelSet {
        self.channels
    }

    /// Pixel plane for `c`, if requested.
    pub fn channel(&self, c: Channel) -> Option<&[f32]> {
        self.channels
            .contains(c)
            .then(|| self.planes[c.index()].as_slice())
    }

    /// Mutable pixel plane for `c`, if requested.
    pub fn channel_mut(&mut self, c: Channel) -> Option<&mut [f32]> {
        if self.channels.contains(c) {
            Some(self.planes[c.index()].as_mut_slice())
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/row.rs"]
mod tests;
