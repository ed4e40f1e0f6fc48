/// Color membership tests
///
/// A `ColorModel` decides whether a single pixel belongs to the color the
/// sentinel watches for. Models are validated on construction and are plain
/// immutable values afterwards, so one model can be shared by any number of
/// threads evaluating frames.
use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// Color space in which a model's bounds or reference color are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// Raw channels, each 0..=255.
    Rgb,
    /// Hue in degrees (0..360), saturation and value in percent (0..=100).
    Hsv,
    /// CIE L*a*b* with D65 white point.
    Lab,
}

impl ColorSpace {
    /// Convert an 8-bit sRGB pixel into this space.
    pub fn convert(&self, pixel: &Rgb<u8>) -> [f64; 3] {
        match self {
            ColorSpace::Rgb => [pixel[0] as f64, pixel[1] as f64, pixel[2] as f64],
            ColorSpace::Hsv => rgb_to_hsv(pixel),
            ColorSpace::Lab => rgb_to_lab(pixel),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ColorSpace::Rgb => "rgb",
            ColorSpace::Hsv => "hsv",
            ColorSpace::Lab => "lab",
        }
    }
}

/// Predicate over a pixel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorModel {
    /// Inclusive per-channel bounds.
    Range {
        space: ColorSpace,
        lower: [f64; 3],
        upper: [f64; 3],
    },
    /// Euclidean distance to a reference color.
    Distance {
        space: ColorSpace,
        reference: [f64; 3],
        tolerance: f64,
    },
}

impl ColorModel {
    /// Build a range model, rejecting inverted or non-finite bounds.
    pub fn range(
        space: ColorSpace,
        lower: [f64; 3],
        upper: [f64; 3],
    ) -> Result<Self, SentinelError> {
        let model = ColorModel::Range { space, lower, upper };
        model.validate()?;
        Ok(model)
    }

    /// Build a distance model, rejecting a negative or non-finite tolerance.
    pub fn distance(
        space: ColorSpace,
        reference: [f64; 3],
        tolerance: f64,
    ) -> Result<Self, SentinelError> {
        let model = ColorModel::Distance {
            space,
            reference,
            tolerance,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the construction rules again.
    ///
    /// Models that arrive through deserialization skip the constructors, so
    /// the config layer calls this before a pipeline is built.
    pub fn validate(&self) -> Result<(), SentinelError> {
        match self {
            ColorModel::Range { space, lower, upper } => {
                for channel in 0..3 {
                    if !lower[channel].is_finite() || !upper[channel].is_finite() {
                        return Err(SentinelError::configuration(format!(
                            "{} range bounds must be finite (channel {})",
                            space.name(),
                            channel
                        )));
                    }
                    if lower[channel] > upper[channel] {
                        return Err(SentinelError::configuration(format!(
                            "{} range channel {} is inverted: lower {} > upper {}",
                            space.name(),
                            channel,
                            lower[channel],
                            upper[channel]
                        )));
                    }
                }
                Ok(())
            }
            ColorModel::Distance {
                space,
                reference,
                tolerance,
            } => {
                if reference.iter().any(|v| !v.is_finite()) {
                    return Err(SentinelError::configuration(format!(
                        "{} reference color must be finite",
                        space.name()
                    )));
                }
                if !tolerance.is_finite() || *tolerance < 0.0 {
                    return Err(SentinelError::configuration(format!(
                        "distance tolerance must be a non-negative number, got {}",
                        tolerance
                    )));
                }
                Ok(())
            }
        }
    }

    /// Membership test. Pure; safe to call from any thread.
    pub fn matches(&self, pixel: &Rgb<u8>) -> bool {
        match self {
            ColorModel::Range { space, lower, upper } => {
                let value = space.convert(pixel);
                (0..3).all(|c| value[c] >= lower[c] && value[c] <= upper[c])
            }
            ColorModel::Distance {
                space,
                reference,
                tolerance,
            } => {
                let value = space.convert(pixel);
                squared_distance(*space, &value, reference) <= tolerance * tolerance
            }
        }
    }
}

fn squared_distance(space: ColorSpace, a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let mut d0 = (a[0] - b[0]).abs();
    if space == ColorSpace::Hsv {
        // hue lives on a circle
        d0 = d0.rem_euclid(360.0);
        d0 = d0.min(360.0 - d0);
    }
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

fn rgb_to_hsv(pixel: &Rgb<u8>) -> [f64; 3] {
    let r = pixel[0] as f64 / 255.0;
    let g = pixel[1] as f64 / 255.0;
    let b = pixel[2] as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    [hue.rem_euclid(360.0), saturation * 100.0, max * 100.0]
}

fn rgb_to_lab(pixel: &Rgb<u8>) -> [f64; 3] {
    fn linearize(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    fn f(t: f64) -> f64 {
        const DELTA: f64 = 6.0 / 29.0;
        if t > DELTA * DELTA * DELTA {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    }

    let r = linearize(pixel[0]);
    let g = linearize(pixel[1]);
    let b = linearize(pixel[2]);

    // sRGB -> XYZ, normalised by the D65 white point
    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = (0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b) / 1.088_83;

    let fx = f(x);
    let fy = f(y);
    let fz = f(z);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_range_inclusive() {
        let model = ColorModel::range(ColorSpace::Rgb, [200.0, 0.0, 0.0], [255.0, 50.0, 50.0])
            .unwrap();
        assert!(model.matches(&Rgb([200, 0, 0])));
        assert!(model.matches(&Rgb([255, 50, 50])));
        assert!(!model.matches(&Rgb([199, 0, 0])));
        assert!(!model.matches(&Rgb([255, 51, 0])));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = ColorModel::range(ColorSpace::Rgb, [10.0, 0.0, 0.0], [5.0, 10.0, 10.0])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = ColorModel::distance(ColorSpace::Lab, [50.0, 0.0, 0.0], -1.0).unwrap_err();
        assert!(err.is_configuration());

        let err = ColorModel::distance(ColorSpace::Lab, [50.0, 0.0, 0.0], f64::NAN).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_hsv_conversion() {
        let red = rgb_to_hsv(&Rgb([255, 0, 0]));
        assert_eq!(red, [0.0, 100.0, 100.0]);

        let green = rgb_to_hsv(&Rgb([0, 255, 0]));
        assert!((green[0] - 120.0).abs() < 1e-9);

        let blue = rgb_to_hsv(&Rgb([0, 0, 255]));
        assert!((blue[0] - 240.0).abs() < 1e-9);

        let gray = rgb_to_hsv(&Rgb([128, 128, 128]));
        assert_eq!(gray[0], 0.0);
        assert_eq!(gray[1], 0.0);
    }

    #[test]
    fn test_lab_conversion_reference_points() {
        let white = rgb_to_lab(&Rgb([255, 255, 255]));
        assert!((white[0] - 100.0).abs() < 0.01);
        assert!(white[1].abs() < 0.01);
        assert!(white[2].abs() < 0.01);

        let black = rgb_to_lab(&Rgb([0, 0, 0]));
        assert!(black[0].abs() < 1e-9);

        // sRGB red is roughly L=53, a=80, b=67
        let red = rgb_to_lab(&Rgb([255, 0, 0]));
        assert!((red[0] - 53.24).abs() < 0.1);
        assert!((red[1] - 80.09).abs() < 0.2);
        assert!((red[2] - 67.20).abs() < 0.2);
    }

    #[test]
    fn test_hue_distance_wraps() {
        // hue 350 and hue 10 are 20 degrees apart, not 340
        let model = ColorModel::distance(ColorSpace::Hsv, [350.0, 100.0, 100.0], 25.0).unwrap();
        // pure red with a touch of green sits at a small positive hue
        let pixel = Rgb([255, 40, 0]);
        let hsv = rgb_to_hsv(&pixel);
        assert!(hsv[0] > 5.0 && hsv[0] < 15.0);
        assert!(model.matches(&pixel));
    }

    #[test]
    fn test_lab_distance_zero_tolerance() {
        let reference = rgb_to_lab(&Rgb([10, 200, 30]));
        let model = ColorModel::distance(ColorSpace::Lab, reference, 0.0).unwrap();
        assert!(model.matches(&Rgb([10, 200, 30])));
        assert!(!model.matches(&Rgb([10, 201, 30])));
    }

    #[test]
    fn test_model_serialization() {
        let model = ColorModel::range(ColorSpace::Hsv, [0.0, 50.0, 50.0], [20.0, 100.0, 100.0])
            .unwrap();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"range\""));
        assert!(json.contains("\"space\":\"hsv\""));
        let back: ColorModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
