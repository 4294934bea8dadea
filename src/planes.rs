// planes.rs — per texture-plane geometry

use crate::panorama::{MultiviewMode, VisibleRegion};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Upper bound on texture planes (Y, U, V).
pub const MAX_PLANES: usize = 3;

/// Fixed-capacity array holding one value per texture plane.
///
/// Never allocates; the capacity is `MAX_PLANES`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneArray<T> {
    slots: [Option<T>; MAX_PLANES],
    len: usize,
}

impl<T> Default for PlaneArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PlaneArray<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    /// Builds `len` values; `len` beyond `MAX_PLANES` is truncated.
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> T) -> Self {
        let mut out = Self::new();
        for i in 0..len.min(MAX_PLANES) {
            out.slots[i] = Some(f(i));
        }
        out.len = len.min(MAX_PLANES);
        out
    }

    /// Like `from_fn`, stopping at the first error.
    ///
    /// Values built before the failure are handed back with the error so the
    /// caller can release them.
    pub fn try_from_fn<E>(
        len: usize,
        mut f: impl FnMut(usize) -> Result<T, E>,
    ) -> Result<Self, (Self, E)> {
        let mut out = Self::new();
        for i in 0..len.min(MAX_PLANES) {
            match f(i) {
                Ok(v) => {
                    out.slots[i] = Some(v);
                    out.len = i + 1;
                }
                Err(e) => return Err((out, e)),
            }
        }
        Ok(out)
    }

    /// Appends a value, handing it back when the array is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == MAX_PLANES {
            return Err(value);
        }
        self.slots[self.len] = Some(value);
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots[..self.len].iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots[..self.len].iter_mut().flatten()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PlaneArray<U> {
        let mut out = PlaneArray::new();
        for (slot, v) in out.slots.iter_mut().zip(self.iter()) {
            *slot = Some(f(v));
        }
        out.len = self.len;
        out
    }
}

impl<T> Index<usize> for PlaneArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(v) => v,
            None => panic!("plane index {index} out of range (len {})", self.len),
        }
    }
}

impl<T> IndexMut<usize> for PlaneArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(index) {
            Some(v) => v,
            None => panic!("plane index {index} out of range (len {len})"),
        }
    }
}

/// Rational subsampling factor of a plane relative to the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub num: u32,
    pub den: u32,
}

impl Ratio {
    pub const ONE: Ratio = Ratio { num: 1, den: 1 };
    pub const HALF: Ratio = Ratio { num: 1, den: 2 };

    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// A zero denominator counts as one.
    pub fn as_f32(self) -> f32 {
        self.num as f32 / self.den.max(1) as f32
    }

    fn scale(self, value: u32) -> u32 {
        (value as u64 * self.num as u64 / self.den.max(1) as u64) as u32
    }
}

/// Width and height subsampling of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneRatio {
    pub w: Ratio,
    pub h: Ratio,
}

impl PlaneRatio {
    pub const FULL: PlaneRatio = PlaneRatio {
        w: Ratio::ONE,
        h: Ratio::ONE,
    };

    /// Chroma plane of a 4:2:0 picture.
    pub const CHROMA_420: PlaneRatio = PlaneRatio {
        w: Ratio::HALF,
        h: Ratio::HALF,
    };
}

/// Allocated texture size of one plane, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

/// Texture size for one plane of a picture showing `visible_width`x`visible_height`.
///
/// Without NPOT support the texture is rounded up to powers of two.
pub fn texture_size(
    visible_width: u32,
    visible_height: u32,
    ratio: PlaneRatio,
    supports_npot: bool,
) -> TextureSize {
    let width = ratio.w.scale(visible_width);
    let height = ratio.h.scale(visible_height);
    if supports_npot {
        TextureSize { width, height }
    } else {
        TextureSize {
            width: width.next_power_of_two(),
            height: height.next_power_of_two(),
        }
    }
}

/// Sampling rectangle in normalized plane-texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PlaneRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Part of the rectangle holding the left eye of a stereo frame.
    pub fn stereo_crop(self, mode: MultiviewMode) -> Self {
        // (width coefficient, height coefficient); offsets are always 0 for the left eye
        let (cw, ch) = match mode {
            MultiviewMode::None => return self,
            MultiviewMode::StereoTopBottom => (1.0, 0.5),
            MultiviewMode::StereoSideBySide => (0.5, 1.0),
        };
        let width = self.width();
        let height = self.height();
        Self {
            left: self.left,
            top: self.top,
            right: self.left + width * cw,
            bottom: self.top + height * ch,
        }
    }
}

/// Region of plane `ratio` sampled for a visible source region.
pub fn sampling_rect(region: &VisibleRegion, ratio: PlaneRatio, size: TextureSize) -> PlaneRect {
    // Without NPOT the texture is larger than the picture; right/bottom then
    // fall between initialized and uninitialized texels.
    let scale_w = ratio.w.as_f32() / size.width.max(1) as f32;
    let scale_h = ratio.h.as_f32() / size.height.max(1) as f32;

    PlaneRect {
        left: region.x_offset as f32 * scale_w,
        top: region.y_offset as f32 * scale_h,
        right: (region.x_offset as f32 + region.width as f32) * scale_w,
        bottom: (region.y_offset as f32 + region.height as f32) * scale_h,
    }
}
