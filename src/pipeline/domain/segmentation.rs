/// Per-pixel person probability, row-major. Binary masks use 0.0 and 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl SegmentationMask {
    /// Returns `None` when `data` does not hold exactly `width * height` values.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, probability: f32) -> Self {
        Self {
            width,
            height,
            data: vec![probability; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn probability(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn is_person(&self, x: u32, y: u32, threshold: f32) -> bool {
        self.probability(x, y) >= threshold
    }
}
