use crate::utils::complex::WaveFloat;
use image::{imageops, Rgb, RgbImage};
use ndarray::Array2;
use num::Complex;
use std::f64::consts::PI;

/// Hue encodes the phase `atan2(im, re) + pi` over the full hue circle, value encodes
/// `|ψ|` relative to the largest magnitude on the grid, saturation is maximal.
pub fn complex_to_image<T: WaveFloat>(ψ: &Array2<Complex<T>>) -> RgbImage {
    let (lx, ly) = ψ.dim();
    let magnitude = ψ.mapv(|c| to_f64(c.norm()));
    let max = magnitude.iter().fold(0.0_f64, |acc, &m| acc.max(m));

    let mut image = RgbImage::new(ly as u32, lx as u32);
    for ((x, y), c) in ψ.indexed_iter() {
        let hue = (to_f64(c.im).atan2(to_f64(c.re)) + PI).to_degrees();
        let value = if max > 0.0 { magnitude[[x, y]] / max } else { 0.0 };
        image.put_pixel(y as u32, x as u32, Rgb(hsv_to_rgb(hue, 1.0, value)));
    }
    image
}

/// Grayscale image of `p / max(p)`; negative cells are black
pub fn scalar_to_image<T: WaveFloat>(p: &Array2<T>) -> RgbImage {
    let (lx, ly) = p.dim();
    let max = p.iter().fold(0.0_f64, |acc, &v| acc.max(to_f64(v)));

    let mut image = RgbImage::new(ly as u32, lx as u32);
    for ((x, y), &v) in p.indexed_iter() {
        let level = if max > 0.0 { to_f64(v) / max } else { 0.0 };
        let gray = to_u8(level);
        image.put_pixel(y as u32, x as u32, Rgb([gray, gray, gray]));
    }
    image
}

/// Bilinear upscale by an integer factor
pub fn upscale(image: &RgbImage, scale: u32) -> RgbImage {
    if scale <= 1 {
        return image.clone();
    }
    imageops::resize(
        image,
        image.width() * scale,
        image.height() * scale,
        imageops::FilterType::Triangle,
    )
}

/// `hue` in degrees, `saturation` and `value` in [0, 1]
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let chroma = value * saturation;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - chroma;
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    [to_u8(r + m), to_u8(g + m), to_u8(b + m)]
}

fn to_u8(level: f64) -> u8 {
    (level * 255.0).round().clamp(0.0, 255.0) as u8
}

fn to_f64<T: WaveFloat>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[test]
fn test_hsv_primaries() {
    assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
    assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), [0, 255, 0]);
    assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), [0, 0, 255]);
    assert_eq!(hsv_to_rgb(360.0, 1.0, 1.0), [255, 0, 0]);
    assert_eq!(hsv_to_rgb(60.0, 1.0, 0.5), [128, 128, 0]);
    assert_eq!(hsv_to_rgb(200.0, 1.0, 0.0), [0, 0, 0]);
}

#[test]
fn test_complex_to_image_phase_and_magnitude() {
    let mut ψ = Array2::from_elem((2, 3), Complex::<f64>::new(0.0, 0.0));
    // phase pi -> hue 360 (red), full magnitude
    ψ[[0, 0]] = Complex::new(-2.0, 0.0);
    // phase 0 -> hue 180 (cyan), half magnitude
    ψ[[1, 2]] = Complex::new(1.0, 0.0);

    let image = complex_to_image(&ψ);
    assert_eq!((image.width(), image.height()), (3, 2));
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(2, 1).0, [0, 128, 128]);
    assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0]);
}

#[test]
fn test_complex_to_image_of_zero_field_is_black() {
    let ψ = Array2::from_elem((3, 3), Complex::<f32>::new(0.0, 0.0));
    let image = complex_to_image(&ψ);
    assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn test_scalar_to_image_relative_to_max() {
    let mut p = Array2::<f64>::zeros((2, 2));
    p[[0, 1]] = 50.0;
    p[[1, 0]] = 25.0;
    let image = scalar_to_image(&p);
    assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255]);
    assert_eq!(image.get_pixel(0, 1).0, [128, 128, 128]);
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
}

#[test]
fn test_upscale_dimensions() {
    let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
    let big = upscale(&image, 6);
    assert_eq!((big.width(), big.height()), (24, 18));
    assert_eq!(big.get_pixel(11, 9).0, [10, 20, 30]);
    assert_eq!(upscale(&image, 1), image);
}
