//! RGBA image buffer, nearest-neighbour resizing and PAM encoding.

/// Row-major RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbaImage {
    /// Wrap a raw buffer of `width * height * 4` bytes.
    ///
    /// A short buffer is padded with transparent pixels; extra bytes are dropped.
    pub fn from_raw(width: usize, height: usize, mut pixels: Vec<u8>) -> Self {
        pixels.resize(width * height * 4, 0);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Resample to `width` x `height` choosing the nearest source pixel.
    pub fn resize_nearest(&self, width: usize, height: usize) -> RgbaImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = vec![0u8; width * height * 4];
        if self.width == 0 || self.height == 0 {
            return RgbaImage::from_raw(width, height, out);
        }
        for y in 0..height {
            let sy = ((y as f64 + 0.5) * self.height as f64 / height as f64) as usize;
            let sy = sy.min(self.height - 1);
            for x in 0..width {
                let sx = ((x as f64 + 0.5) * self.width as f64 / width as f64) as usize;
                let sx = sx.min(self.width - 1);
                let src = (sy * self.width + sx) * 4;
                let dst = (y * width + x) * 4;
                out[dst..dst + 4].copy_from_slice(&self.pixels[src..src + 4]);
            }
        }
        RgbaImage::from_raw(width, height, out)
    }

    /// Resize so the longest side equals `longest`, keeping the aspect ratio.
    pub fn fit_longest_side(&self, longest: usize) -> RgbaImage {
        let (width, height) = fit_dimensions(self.width, self.height, longest);
        self.resize_nearest(width, height)
    }

    /// Encode as a Netpbm PAM (`P7`, `RGB_ALPHA`) file.
    pub fn to_pam(&self) -> Vec<u8> {
        let header = format!(
            "P7\nWIDTH {}\nHEIGHT {}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n",
            self.width, self.height
        );
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// Output dimensions whose longest side is `longest`, at least 1 px each.
pub fn fit_dimensions(width: usize, height: usize, longest: usize) -> (usize, usize) {
    if width == 0 || height == 0 || longest == 0 {
        return (width, height);
    }
    if width >= height {
        let h = (height as f64 * longest as f64 / width as f64).round() as usize;
        (longest, h.max(1))
    } else {
        let w = (width as f64 * longest as f64 / height as f64).round() as usize;
        (w.max(1), longest)
    }
}
