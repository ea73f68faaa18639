use crate::foundation::core::PixelSize;
use crate::foundation::error::{FramecutError, FramecutResult};

/// One RGBA8 frame, tightly packed and row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Wrap decoded bytes, checking the length.
    pub fn from_raw(size: PixelSize, data: Vec<u8>, premultiplied: bool) -> FramecutResult<Self> {
        if data.len() != size.rgba_len() {
            return Err(FramecutError::validation(format!(
                "frame byte length {} does not match {}x{}",
                data.len(),
                size.width,
                size.height
            )));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied,
        })
    }

    /// Frame filled with one color.
    pub fn solid(size: PixelSize, rgba: [u8; 4]) -> Self {
        let mut data = vec![0u8; size.rgba_len()];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied: rgba[3] == 255,
        }
    }

    /// Frame dimensions.
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub(crate) fn stride(&self) -> usize {
        self.width as usize * 4
    }
}
