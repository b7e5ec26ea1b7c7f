//! RGBA8 pixel buffer backing the drawing surface.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest brush radius that still produces a connected line.
const MIN_BRUSH_RADIUS: f64 = 0.75;

/// Largest raster edge in pixels.
pub const MAX_RASTER_EDGE: u32 = 4096;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Force full opacity.
    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }
}

/// Stroke appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub color: Rgba8,
    /// Line width in device pixels.
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Rgba8::black(),
            width: 2.0,
        }
    }
}

/// Errors while decoding an encoded raster.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("PNG decoding failed: {0}")]
    Png(#[from] png::DecodingError),
    #[error("Unsupported PNG color layout: {0:?}")]
    UnsupportedColor(png::ColorType),
}

/// A fixed-size RGBA8 raster, row-major, no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Raster {
    /// Create a raster filled with `background`. Each dimension is clamped
    /// to `1..=MAX_RASTER_EDGE`.
    pub fn new(width: u32, height: u32, background: Rgba8) -> Self {
        let width = width.clamp(1, MAX_RASTER_EDGE);
        let height = height.clamp(1, MAX_RASTER_EDGE);
        let mut raster = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        };
        raster.fill(background);
        raster
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    pub fn fill(&mut self, color: Rgba8) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let p = &self.pixels[i..i + 4];
        Some(Rgba8::new(p[0], p[1], p[2], p[3]))
    }

    /// Whether every pixel equals `color`.
    pub fn is_filled_with(&self, color: Rgba8) -> bool {
        self.count_pixels(color) == self.width as usize * self.height as usize
    }

    pub fn count_pixels(&self, color: Rgba8) -> usize {
        let needle = [color.r, color.g, color.b, color.a];
        self.pixels
            .chunks_exact(4)
            .filter(|px| *px == needle)
            .count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn put(&mut self, x: u32, y: u32, color: Rgba8) {
        let i = self.index(x, y);
        self.pixels[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Render a line segment with round caps. Returns the pixel rect that was
    /// touched, or `None` if the segment lies fully outside the raster.
    pub fn draw_segment(&mut self, from: Point, to: Point, brush: &Brush) -> Option<Rect> {
        let radius = (brush.width / 2.0).max(MIN_BRUSH_RADIUS);
        let area = Rect::from_points(from, to)
            .inflate(radius, radius)
            .intersect(self.bounds());
        if area.area() <= 0.0 {
            return None;
        }

        let x0 = area.x0.floor() as u32;
        let y0 = area.y0.floor() as u32;
        let x1 = (area.x1.ceil() as u32).min(self.width);
        let y1 = (area.y1.ceil() as u32).min(self.height);
        let radius_sq = radius * radius;

        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if distance_sq_to_segment(center, from, to) <= radius_sq {
                    self.put(x, y, brush.color);
                }
            }
        }

        Some(Rect::new(x0 as f64, y0 as f64, x1 as f64, y1 as f64))
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(png_data)
    }

    /// Decode a PNG into an RGBA raster.
    pub fn decode_png(data: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        let bytes = &buf[..info.buffer_size()];

        let pixels = match info.color_type {
            png::ColorType::Rgba => bytes.to_vec(),
            png::ColorType::Rgb => bytes
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => bytes
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            png::ColorType::Grayscale => bytes.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            other => return Err(DecodeError::UnsupportedColor(other)),
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            pixels,
        })
    }
}

fn distance_sq_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let line_vec = end - start;
    let point_vec = point - start;
    let line_len_sq = line_vec.hypot2();
    if line_len_sq < f64::EPSILON {
        return point_vec.hypot2();
    }
    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    let projection = start + line_vec * t;
    Vec2::new(point.x - projection.x, point.y - projection.y).hypot2()
}
