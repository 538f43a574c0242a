//! Stencil configuration for tile cutouts and the content behind them.
//!
//! Each tile owns one stencil id. Its cutout shape stamps that id into the
//! stencil buffer wherever it is drawn; everything inside the tile is drawn
//! with an `Equal` test against the same id so it only shows through its own
//! cutout. Id 0 is the cleared background and is never handed out.

use std::num::NonZeroU8;

use crate::config::MAX_STENCIL_TILES;
use crate::error::{Result, RingError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StencilId(NonZeroU8);

impl StencilId {
    /// Id for tile `index`: `index + 1`.
    pub fn for_tile(index: usize) -> Result<Self> {
        if index >= MAX_STENCIL_TILES {
            return Err(RingError::TileOutOfRange {
                index,
                count: MAX_STENCIL_TILES,
            });
        }
        NonZeroU8::new((index + 1) as u8)
            .map(Self)
            .ok_or(RingError::TileOutOfRange {
                index,
                count: MAX_STENCIL_TILES,
            })
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Replace,
}

/// Stencil/depth state a material is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilState {
    pub write: bool,
    pub reference: u8,
    pub func: StencilFunc,
    pub z_pass: StencilOp,
    pub depth_write: bool,
}

impl StencilState {
    /// Plain opaque material that ignores the stencil buffer.
    pub const DISABLED: Self = Self {
        write: false,
        reference: 0,
        func: StencilFunc::Always,
        z_pass: StencilOp::Keep,
        depth_write: true,
    };

    /// Cutout: always passes and replaces the buffer with `id`. Depth writes
    /// are off so content behind the cutout is not rejected by it.
    pub fn writer(id: StencilId) -> Self {
        Self {
            write: true,
            reference: id.get(),
            func: StencilFunc::Always,
            z_pass: StencilOp::Replace,
            depth_write: false,
        }
    }

    /// Inner content: survives only where the buffer already holds `id`.
    pub fn reader(id: StencilId) -> Self {
        Self {
            write: true,
            reference: id.get(),
            func: StencilFunc::Equal,
            z_pass: StencilOp::Replace,
            depth_write: true,
        }
    }

    #[inline]
    pub fn is_writer(&self) -> bool {
        self.write && self.func == StencilFunc::Always && self.z_pass == StencilOp::Replace
    }

    #[inline]
    pub fn is_reader(&self) -> bool {
        self.write && self.func == StencilFunc::Equal
    }

    /// Would a fragment pass the stencil test against `buffer_value`?
    pub fn passes(&self, buffer_value: u8) -> bool {
        if !self.write {
            return true;
        }
        match self.func {
            StencilFunc::Always => true,
            StencilFunc::Equal => buffer_value == self.reference,
        }
    }

    /// Buffer value after a fragment passes.
    pub fn apply(&self, buffer_value: u8) -> u8 {
        if !self.write || !self.passes(buffer_value) {
            return buffer_value;
        }
        match self.z_pass {
            StencilOp::Keep => buffer_value,
            StencilOp::Replace => self.reference,
        }
    }
}

/// Writer and reader states for one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileStencil {
    pub id: StencilId,
    pub writer: StencilState,
    pub reader: StencilState,
}

impl TileStencil {
    pub fn for_tile(index: usize) -> Result<Self> {
        let id = StencilId::for_tile(index)?;
        Ok(Self {
            id,
            writer: StencilState::writer(id),
            reader: StencilState::reader(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_only_passes_on_matching_id() {
        let s = TileStencil::for_tile(2).unwrap();
        assert!(s.reader.passes(3));
        assert!(!s.reader.passes(0));
        assert!(!s.reader.passes(4));
    }

    #[test]
    fn writer_stamps_its_id() {
        let s = TileStencil::for_tile(0).unwrap();
        assert_eq!(s.writer.apply(0), 1);
        assert_eq!(s.writer.apply(7), 1);
        assert!(!s.writer.depth_write);
    }

    #[test]
    fn index_past_stencil_range_is_rejected() {
        assert!(StencilId::for_tile(254).is_ok());
        assert!(StencilId::for_tile(255).is_err());
    }
}
