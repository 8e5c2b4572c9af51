use crate::{
    render::{Frame, Recorder, Renderer, DISSIPATION_VIEW, POTENTIAL_VIEW, SOLUTION_VIEW},
    simulation_object::SimulationObject,
    utils::{complex::WaveFloat, error::RuntimeError},
};
use std::thread::sleep;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The renderer reported a quit request
    QuitRequested,
    /// The simulated time reached `final_sim_time`
    FinalTimeReached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// Drives a `SimulationObject`: draws it at most `fps` times per second, steps it
/// every iteration, and paces iterations to the configured wall-clock interval.
pub struct SimulationLoop<T, R> {
    pub simulation_object: SimulationObject<T>,
    renderer: R,
    recorder: Option<Box<dyn Recorder>>,
    state: LoopState,
    last_draw: Option<Instant>,
    frames: u64,
}

impl<T: WaveFloat, R: Renderer> SimulationLoop<T, R> {
    pub fn new(
        simulation_object: SimulationObject<T>,
        renderer: R,
        recorder: Option<Box<dyn Recorder>>,
    ) -> Self {
        SimulationLoop {
            simulation_object,
            renderer,
            recorder,
            state: LoopState::Running,
            last_draw: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames of the wavefunction drawn so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Draws the potential and dissipation once
    pub fn show_static_fields(&mut self) -> Result<(), RuntimeError> {
        let grid = &self.simulation_object.grid;
        self.renderer
            .display(POTENTIAL_VIEW, Frame::Scalar(&grid.v))?;
        self.renderer
            .display(DISSIPATION_VIEW, Frame::Scalar(&grid.b))?;
        Ok(())
    }

    /// One pass of the loop: maybe draw, step, then pace
    pub fn iterate(&mut self) -> Result<LoopState, RuntimeError> {
        if self.state != LoopState::Running {
            return Ok(self.state);
        }
        let start = Instant::now();

        if !self.simulation_object.not_finished() {
            log::info!(
                "reached final time {} after {} steps",
                self.simulation_object.parameters.time,
                self.simulation_object.steps
            );
            self.state = LoopState::Stopped(StopReason::FinalTimeReached);
            return Ok(self.state);
        }

        let frame_interval = self.simulation_object.parameters.frame_interval;
        let draw_due = self
            .last_draw
            .map_or(true, |last| last.elapsed() > frame_interval);
        if draw_due {
            let image = self
                .renderer
                .display(SOLUTION_VIEW, Frame::Complex(&self.simulation_object.grid.ψ))?;
            if self.renderer.quit_requested()? {
                log::info!(
                    "quit requested after {} steps",
                    self.simulation_object.steps
                );
                self.state = LoopState::Stopped(StopReason::QuitRequested);
                return Ok(self.state);
            }
            self.last_draw = Some(Instant::now());
            self.frames += 1;
            log::debug!(
                "frame {} at step {} (t = {}, peak |ψ|^2 = {})",
                self.frames,
                self.simulation_object.steps,
                self.simulation_object.parameters.time,
                self.simulation_object.peak_amplitude()
            );
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.write(&image)?;
            }
        }

        self.simulation_object.update()?;

        // Never faster than the pacing interval; no catching up when slower
        let pacing_interval = self.simulation_object.parameters.pacing_interval;
        let elapsed = start.elapsed();
        if elapsed < pacing_interval {
            sleep(pacing_interval - elapsed);
        }
        Ok(self.state)
    }

    /// Iterates until stopped
    pub fn run(&mut self) -> Result<StopReason, RuntimeError> {
        loop {
            if let LoopState::Stopped(reason) = self.iterate()? {
                return Ok(reason);
            }
        }
    }

    pub fn into_parts(self) -> (SimulationObject<T>, R) {
        (self.simulation_object, self.renderer)
    }
}

#[cfg(test)]
mod test_support {
    use super::*;
    use image::RgbImage;
    use std::{cell::RefCell, rc::Rc};

    /// Requests quit on the `quit_on`-th poll
    pub struct ScriptedRenderer {
        pub shown: Vec<String>,
        pub polls: usize,
        pub quit_on: usize,
    }

    impl ScriptedRenderer {
        pub fn new(quit_on: usize) -> Self {
            ScriptedRenderer {
                shown: vec![],
                polls: 0,
                quit_on,
            }
        }
    }

    impl Renderer for ScriptedRenderer {
        fn show(&mut self, name: &str, _image: &RgbImage) -> Result<(), RuntimeError> {
            self.shown.push(name.to_string());
            Ok(())
        }
        fn quit_requested(&mut self) -> Result<bool, RuntimeError> {
            self.polls += 1;
            Ok(self.polls == self.quit_on)
        }
        fn scale(&self) -> u32 {
            2
        }
    }

    pub struct SharedRecorder(pub Rc<RefCell<Vec<(u32, u32)>>>);

    impl Recorder for SharedRecorder {
        fn write(&mut self, image: &RgbImage) -> Result<(), RuntimeError> {
            self.0.borrow_mut().push(image.dimensions());
            Ok(())
        }
    }
}

#[cfg(test)]
fn fast_object(final_sim_time: Option<f64>) -> SimulationObject<f64> {
    use crate::simulation_object::parameters_from_toml;
    use qwave_common::{DissipationParameters, TomlParameters};

    let toml = TomlParameters {
        size: [16, 12],
        // draw every iteration, never sleep
        fps: 1e9,
        pacing_interval: Some(0.0),
        final_sim_time,
        dissipation: DissipationParameters {
            thickness: 3,
            ..Default::default()
        },
        ..Default::default()
    };
    SimulationObject::new_from_params(parameters_from_toml(toml).unwrap()).unwrap()
}

#[test]
fn test_quit_stops_before_stepping() {
    use test_support::*;

    let mut simulation_loop = SimulationLoop::new(fast_object(None), ScriptedRenderer::new(3), None);
    let reason = simulation_loop.run().unwrap();

    assert_eq!(reason, StopReason::QuitRequested);
    assert_eq!(simulation_loop.state(), LoopState::Stopped(StopReason::QuitRequested));
    assert_eq!(simulation_loop.simulation_object.steps, 2);
    assert_eq!(simulation_loop.frames(), 2);
    assert_eq!(simulation_loop.renderer().shown, vec![SOLUTION_VIEW; 3]);

    // stopped is terminal
    assert_eq!(
        simulation_loop.iterate().unwrap(),
        LoopState::Stopped(StopReason::QuitRequested)
    );
    assert_eq!(simulation_loop.simulation_object.steps, 2);
}

#[test]
fn test_final_time_stops_loop_and_frames_are_recorded() {
    use std::{cell::RefCell, rc::Rc};
    use test_support::*;

    let recorded = Rc::new(RefCell::new(vec![]));
    let recorder: Box<dyn Recorder> = Box::new(SharedRecorder(Rc::clone(&recorded)));
    let mut simulation_loop = SimulationLoop::new(
        fast_object(Some(4.5e-4)),
        ScriptedRenderer::new(usize::MAX),
        Some(recorder),
    );
    simulation_loop.show_static_fields().unwrap();
    let reason = simulation_loop.run().unwrap();

    assert_eq!(reason, StopReason::FinalTimeReached);
    assert_eq!(simulation_loop.simulation_object.steps, 5);
    assert_eq!(
        &simulation_loop.renderer().shown[..2],
        &[POTENTIAL_VIEW.to_string(), DISSIPATION_VIEW.to_string()]
    );
    // static fields are not recorded; upscaled by 2, grid x is the image row
    assert_eq!(*recorded.borrow(), vec![(24, 32); 5]);
}

#[test]
fn test_draws_are_throttled_to_frame_rate() {
    use crate::simulation_object::parameters_from_toml;
    use qwave_common::TomlParameters;
    use test_support::*;

    let toml = TomlParameters {
        size: [12, 12],
        fps: 1e-3,
        pacing_interval: Some(0.0),
        final_sim_time: Some(9.5e-4),
        dissipation: qwave_common::DissipationParameters {
            thickness: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let simulation_object: SimulationObject<f64> =
        SimulationObject::new_from_params(parameters_from_toml(toml).unwrap()).unwrap();
    let mut simulation_loop = SimulationLoop::new(simulation_object, ScriptedRenderer::new(0), None);
    simulation_loop.run().unwrap();

    // first iteration always draws, the next one is 1000 s away
    assert_eq!(simulation_loop.frames(), 1);
    assert_eq!(simulation_loop.simulation_object.steps, 10);
}

#[test]
fn test_iterations_are_paced() {
    use crate::simulation_object::parameters_from_toml;
    use qwave_common::TomlParameters;
    use std::time::Duration;
    use test_support::*;

    let toml = TomlParameters {
        size: [12, 12],
        pacing_interval: Some(0.02),
        final_sim_time: Some(2.5e-4),
        dissipation: qwave_common::DissipationParameters {
            thickness: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let simulation_object: SimulationObject<f64> =
        SimulationObject::new_from_params(parameters_from_toml(toml).unwrap()).unwrap();
    let mut simulation_loop = SimulationLoop::new(simulation_object, ScriptedRenderer::new(0), None);

    let start = Instant::now();
    simulation_loop.run().unwrap();
    assert_eq!(simulation_loop.simulation_object.steps, 3);
    assert!(start.elapsed() >= Duration::from_millis(60));
}
