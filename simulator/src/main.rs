use anyhow::Context;
use clap::Parser;
use qwave_common::{read_toml, TomlParameters};
use qwave_simulator::{
    render::{GifRecorder, Recorder, TerminalRenderer},
    simulation_loop::SimulationLoop,
    simulation_object::{parameters_from_toml, SimulationObject},
};
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArguments {
    /// path to a toml with simulation parameters (the double slit run if omitted)
    #[arg(long, short)]
    toml: Option<String>,

    /// append displayed frames to an animated gif at this path
    #[arg(long, short)]
    record: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_secs().init();

    // Start timer
    let now = Instant::now();

    let args = CommandLineArguments::parse();
    let mut toml: TomlParameters = match &args.toml {
        Some(path) => read_toml(path)?,
        None => TomlParameters::default(),
    };
    if args.record.is_some() {
        toml.record = args.record;
    }

    let parameters = parameters_from_toml::<f64>(toml)?;
    log::info!("Simulation Parameters\n{parameters}");

    let recorder: Option<Box<dyn Recorder>> = match &parameters.record {
        Some(path) => {
            let recorder = GifRecorder::create(path, parameters.frame_interval)
                .with_context(|| format!("failed to create recording {path}"))?;
            Some(Box::new(recorder))
        }
        None => None,
    };
    let scale = parameters.display_scale;
    let simulation_object = SimulationObject::new_from_params(parameters)?;

    println!("Press esc to quit.");
    let renderer = TerminalRenderer::new(scale).context("terminal display unavailable")?;
    let mut simulation_loop = SimulationLoop::new(simulation_object, renderer, recorder);
    simulation_loop.show_static_fields()?;
    let outcome = simulation_loop.run();

    // Restore the terminal before reporting
    let frames = simulation_loop.frames();
    let (simulation_object, renderer) = simulation_loop.into_parts();
    drop(renderer);

    let reason = outcome?;
    log::info!(
        "stopped ({reason:?}) after {} steps, {frames} frames, t = {} in {} seconds",
        simulation_object.steps,
        simulation_object.parameters.time,
        now.elapsed().as_secs()
    );
    Ok(())
}
