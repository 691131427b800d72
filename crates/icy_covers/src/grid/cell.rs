use crate::ImageHandle;

/// Edge length a cell starts with before the first layout pass
pub const DEFAULT_CELL_SIZE: u32 = 300;

/// One slot of the grid: at most one image plus the square edge it is drawn at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    image: Option<ImageHandle>,
    size: u32,
}

impl Cell {
    pub fn new(image: ImageHandle) -> Self {
        Self {
            image: Some(image),
            size: DEFAULT_CELL_SIZE,
        }
    }

    /// Slot left unfilled after a shortfall
    pub fn empty() -> Self {
        Self {
            image: None,
            size: DEFAULT_CELL_SIZE,
        }
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }

    /// Swap in a new image, keeping the current size.
    pub fn set_image(&mut self, image: ImageHandle) {
        self.image = Some(image);
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Fit into a `width` x `height` slot; cells stay square.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = width.min(height);
    }

    /// The image scaled to the cell edge, for whoever paints the grid.
    pub fn render(&self) -> Option<image::RgbaImage> {
        let image = self.image.as_ref()?;
        let edge = self.size.max(1);
        let rgba = image.to_rgba_image();
        if rgba.width() == edge && rgba.height() == edge {
            return Some(rgba);
        }
        Some(image::imageops::resize(&rgba, edge, edge, image::imageops::FilterType::Triangle))
    }
}

/// Per-cell edge for a display area split into `dimension` rows and columns.
pub fn cell_edge(display_area: (u32, u32), dimension: u32) -> u32 {
    let dimension = dimension.max(1);
    (display_area.0 / dimension).min(display_area.1 / dimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ImageHandle {
        ImageHandle::from_rgba("x.png", image::RgbaImage::from_pixel(8, 4, image::Rgba([1, 2, 3, 255])))
    }

    #[test]
    fn test_resize_keeps_square() {
        let mut cell = Cell::new(handle());
        cell.resize(400, 250);
        assert_eq!(cell.size(), 250);
    }

    #[test]
    fn test_render_scales_to_edge() {
        let mut cell = Cell::new(handle());
        cell.resize(16, 16);
        let rendered = cell.render().unwrap();
        assert_eq!(rendered.dimensions(), (16, 16));
        assert!(Cell::empty().render().is_none());
    }

    #[test]
    fn test_cell_edge() {
        assert_eq!(cell_edge((1200, 900), 3), 300);
        assert_eq!(cell_edge((1000, 1000), 6), 166);
        assert_eq!(cell_edge((100, 100), 0), 100);
    }
}
