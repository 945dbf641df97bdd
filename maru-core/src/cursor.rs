//! Cursors and images.
//!
//! Cursors are exclusively owned by the creating context: simple create and
//! destroy, no reference counting and no reconnection semantics.

/// A tightly packed 32-bit RGBA image.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Image {
    /// Creates an image from raw RGBA pixels.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero or `rgba` is not exactly
    /// `width * height * 4` bytes. This is a programming error, not a
    /// recoverable failure.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be non-zero");
        assert_eq!(
            rgba.len(),
            width as usize * height as usize * 4,
            "image buffer does not match dimensions",
        );
        Image {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SystemCursor {
    Arrow,
    Text,
    Crosshair,
    Hand,
    ResizeEastWest,
    ResizeNorthSouth,
    ResizeDiagonal,
    ResizeAntiDiagonal,
    NotAllowed,
}

/// How a window presents and constrains its cursor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CursorMode {
    /// The cursor is visible and free.
    Normal,
    /// The cursor is hidden while over the window.
    Hidden,
    /// The cursor is hidden and locked to the window; motion is delivered as
    /// relative movement.
    Captured,
}

impl Default for CursorMode {
    fn default() -> Self {
        CursorMode::Normal
    }
}

/// The recipe a backend realizes a cursor from.
#[derive(Clone, Debug, PartialEq)]
pub enum CursorSource {
    System(SystemCursor),
    Image { image: Image, hotspot: (u32, u32) },
}

/// An opaque handle to a cursor owned by a context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Cursor {
    pub(crate) context: u64,
    pub(crate) id: u64,
}

impl Cursor {
    pub(crate) fn new(context: u64, id: u64) -> Self {
        Cursor { context, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_accepts_matching_buffer() {
        let image = Image::from_rgba(2, 2, vec![0u8; 16]);
        assert_eq!(image.width(), 2);
        assert_eq!(image.rgba().len(), 16);
    }

    #[test]
    #[should_panic]
    fn image_rejects_short_buffer() {
        let _ = Image::from_rgba(2, 2, vec![0u8; 15]);
    }

    #[test]
    #[should_panic]
    fn image_rejects_zero_dimension() {
        let _ = Image::from_rgba(0, 2, Vec::new());
    }
}
