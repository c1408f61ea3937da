//! Colour ramps and piecewise-linear interpolation between their stops.

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn mix(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Ramp position in [0, 1] and its colour.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Colour ramps for index rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Index change: loss red, no change white, gain green
    RedWhiteGreen,
    /// Single-date vegetation index: bare soil brown to dense canopy green
    Ndvi,
    Grayscale,
}

const RED_WHITE_GREEN: &[ColorStop] = &[
    ColorStop::new(0.0, 255, 0, 0),
    ColorStop::new(0.5, 255, 255, 255),
    ColorStop::new(1.0, 0, 128, 0),
];

const NDVI: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

const GRAYSCALE: &[ColorStop] = &[ColorStop::new(0.0, 0, 0, 0), ColorStop::new(1.0, 255, 255, 255)];

impl ColorScheme {
    pub fn stops(&self) -> &'static [ColorStop] {
        match self {
            Self::RedWhiteGreen => RED_WHITE_GREEN,
            Self::Ndvi => NDVI,
            Self::Grayscale => GRAYSCALE,
        }
    }
}

/// Colour of `scheme` at `t`; positions outside [0, 1] take the end colours.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    let stops = scheme.stops();
    let (first, last) = (stops[0], stops[stops.len() - 1]);
    if t.is_nan() || t <= first.t {
        return first.color;
    }
    stops
        .windows(2)
        .find(|pair| t <= pair[1].t)
        .map(|pair| {
            let (lo, hi) = (pair[0], pair[1]);
            lo.color.mix(hi.color, (t - lo.t) / (hi.t - lo.t))
        })
        .unwrap_or(last.color)
}
