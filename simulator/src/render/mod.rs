pub mod colormap;
pub mod recorder;
pub mod terminal;

use crate::utils::{complex::WaveFloat, error::RuntimeError};
use image::RgbImage;
use ndarray::Array2;
use num::Complex;

pub use colormap::{complex_to_image, scalar_to_image, upscale};
pub use recorder::GifRecorder;
pub use terminal::TerminalRenderer;

pub const POTENTIAL_VIEW: &str = "Potential";
pub const DISSIPATION_VIEW: &str = "Dissipation";
pub const SOLUTION_VIEW: &str = "Solution";

/// Something that can be drawn by a `Renderer`
pub enum Frame<'a, T> {
    /// Phase as hue, magnitude as value
    Complex(&'a Array2<Complex<T>>),
    /// Grayscale relative to the maximum
    Scalar(&'a Array2<T>),
}

impl<'a, T: WaveFloat> Frame<'a, T> {
    /// Color image at grid resolution; grid x is the image row
    pub fn to_image(&self) -> RgbImage {
        match self {
            Frame::Complex(ψ) => complex_to_image(ψ),
            Frame::Scalar(p) => scalar_to_image(p),
        }
    }
}

pub trait Renderer {
    /// Presents `image` in the view called `name`
    fn show(&mut self, name: &str, image: &RgbImage) -> Result<(), RuntimeError>;

    /// Non-blocking check for a user request to stop
    fn quit_requested(&mut self) -> Result<bool, RuntimeError>;

    /// Factor by which grid-resolution frames are upscaled before being shown
    fn scale(&self) -> u32;

    /// Color maps `frame`, upscales it, shows it, and returns the shown image
    fn display<T: WaveFloat>(
        &mut self,
        name: &str,
        frame: Frame<'_, T>,
    ) -> Result<RgbImage, RuntimeError> {
        let image = upscale(&frame.to_image(), self.scale());
        self.show(name, &image)?;
        Ok(image)
    }
}

/// A sink for displayed frames
pub trait Recorder {
    fn write(&mut self, image: &RgbImage) -> Result<(), RuntimeError>;
}

#[test]
fn test_display_upscales_to_grid_orientation() {
    struct Collect(Vec<(String, u32, u32)>);
    impl Renderer for Collect {
        fn show(&mut self, name: &str, image: &RgbImage) -> Result<(), RuntimeError> {
            self.0.push((name.to_string(), image.width(), image.height()));
            Ok(())
        }
        fn quit_requested(&mut self) -> Result<bool, RuntimeError> {
            Ok(false)
        }
        fn scale(&self) -> u32 {
            6
        }
    }

    let mut renderer = Collect(vec![]);
    let v = Array2::<f64>::zeros((5, 8));
    let image = renderer.display(POTENTIAL_VIEW, Frame::Scalar(&v)).unwrap();
    // grid x is the image row
    assert_eq!((image.width(), image.height()), (48, 30));
    assert_eq!(renderer.0, vec![(POTENTIAL_VIEW.to_string(), 48, 30)]);
}
