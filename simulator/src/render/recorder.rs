use super::Recorder;
use crate::utils::error::RuntimeError;
use image::{
    buffer::ConvertBuffer,
    codecs::gif::{GifEncoder, Repeat},
    Delay, Frame as GifFrame, RgbImage, RgbaImage,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Appends displayed frames to an animated gif.
/// The file is finalized when the recorder is dropped.
pub struct GifRecorder {
    encoder: GifEncoder<BufWriter<File>>,
    delay: Delay,
    frames: u64,
}

impl GifRecorder {
    /// Each frame is shown for `frame_interval` on playback
    pub fn create<P: AsRef<Path>>(path: P, frame_interval: Duration) -> Result<Self, RuntimeError> {
        let file = BufWriter::new(File::create(path.as_ref())?);
        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite)?;
        log::info!("recording frames to {}", path.as_ref().display());
        Ok(GifRecorder {
            encoder,
            delay: Delay::from_saturating_duration(frame_interval),
            frames: 0,
        })
    }

    /// Number of frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Recorder for GifRecorder {
    fn write(&mut self, image: &RgbImage) -> Result<(), RuntimeError> {
        let rgba: RgbaImage = image.convert();
        self.encoder
            .encode_frame(GifFrame::from_parts(rgba, 0, 0, self.delay))?;
        self.frames += 1;
        Ok(())
    }
}

#[test]
fn test_gif_recorder_writes_every_frame() {
    use image::{codecs::gif::GifDecoder, AnimationDecoder, Rgb};
    use std::io::BufReader;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quantum.gif");

    let mut recorder = GifRecorder::create(&path, Duration::from_millis(40)).unwrap();
    for shade in [0u8, 120, 240] {
        recorder
            .write(&RgbImage::from_pixel(12, 6, Rgb([shade, 0, 255 - shade])))
            .unwrap();
    }
    assert_eq!(recorder.frames(), 3);
    drop(recorder);

    let decoder = GifDecoder::new(BufReader::new(File::open(&path).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].buffer().dimensions(), (12, 6));
}
