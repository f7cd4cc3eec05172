//! Pixel types accepted by the predictor and their grayscale intensity.
//!
//! Feature values are intensity differences, so every element type an image
//! buffer may hold has to reduce to a single `f32`. Scalars convert by value.
//! Color pixels follow dlib's rules: RGB variants average their three
//! channels with integer division (alpha is ignored), HSI uses its intensity
//! channel.

use serde::{Deserialize, Serialize};

/// An element type that can be sampled as a grayscale intensity.
pub trait PixelIntensity: Copy + Default {
    fn intensity(&self) -> f32;
}

macro_rules! scalar_intensity {
    ($($t:ty),*) => {
        $(
            impl PixelIntensity for $t {
                #[inline]
                fn intensity(&self) -> f32 {
                    *self as f32
                }
            }
        )*
    };
}

scalar_intensity!(u8, u16, u32, i8, i16, i32, f32, f64);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbPixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbPixel {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl PixelIntensity for RgbPixel {
    #[inline]
    fn intensity(&self) -> f32 {
        let sum = self.red as u32 + self.green as u32 + self.blue as u32;
        (sum / 3) as f32
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbAlphaPixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbAlphaPixel {
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl PixelIntensity for RgbAlphaPixel {
    #[inline]
    fn intensity(&self) -> f32 {
        let sum = self.red as u32 + self.green as u32 + self.blue as u32;
        (sum / 3) as f32
    }
}

/// Hue, saturation, intensity.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsiPixel {
    pub h: u8,
    pub s: u8,
    pub i: u8,
}

impl HsiPixel {
    pub const fn new(h: u8, s: u8, i: u8) -> Self {
        Self { h, s, i }
    }
}

impl PixelIntensity for HsiPixel {
    #[inline]
    fn intensity(&self) -> f32 {
        self.i as f32
    }
}
