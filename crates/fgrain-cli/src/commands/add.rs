//! Add command
//!
//! Renders film grain onto a PFM frame or a numbered PFM sequence.
//! Command-line parameters override those from `--config`.

use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use fgrain_compute::Backend;
use fgrain_filter::{ClipSource, FilmGrain, FrameServer, GrainConfig, Node};

use crate::AddArgs;

/// Grain settings given on the command line.
fn cli_config(args: &AddArgs) -> GrainConfig {
    GrainConfig {
        num_iterations: args.iterations,
        grain_radius_mean: args.radius_mean,
        grain_radius_std: args.radius_std,
        sigma: args.sigma,
        seed: args.seed,
        seed_mode: args.per_frame_seed.then(|| "perFrame".to_string()),
        range_policy: args.clamp.then(|| "clamp".to_string()),
    }
}

pub fn run(args: AddArgs, verbose: u8) -> Result<()> {
    trace!(input = %args.input, output = %args.output, "add::run");

    let file_config = match &args.config {
        Some(path) => GrainConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => GrainConfig::default(),
    };
    let config = file_config.overlay(&cli_config(&args));
    let backend: Backend = args.backend.parse()?;

    let inputs = super::input_files(&args.input, args.start, args.end)?;
    let outputs = super::output_paths(&args.output, &inputs.numbers)?;

    // per-frame seeds follow the file numbers, not clip positions
    let frames = inputs
        .paths
        .par_iter()
        .zip(inputs.numbers.par_iter())
        .map(|(p, &number)| super::load_numbered_frame(p, number))
        .collect::<Result<Vec<_>>>()?;
    debug!(frames = frames.len(), "frames loaded");

    let clip: Node = Arc::new(ClipSource::new(frames));
    let grain = FilmGrain::with_config(clip, &config, backend)
        .with_context(|| format!("Cannot add grain to {}", args.input))?;
    let params = grain.params().clone();
    info!(
        backend = grain.backend_name(),
        iterations = params.num_iterations(),
        radius_mean = params.grain_radius_mean(),
        radius_std = params.grain_radius_std(),
        sigma = params.sigma(),
        seed = params.seed(),
        "Adding grain"
    );

    if verbose > 0 {
        println!(
            "Adding grain (r={}, sigma={}, n={}) to {} frame(s) on {}",
            params.grain_radius_mean(),
            params.sigma(),
            params.num_iterations(),
            inputs.paths.len(),
            grain.backend_name()
        );
    }

    let node = grain.into_node();
    let server = FrameServer::new();
    let rendered = server.get_frames(&node, 0..inputs.paths.len())?;

    for (frame, path) in rendered.iter().zip(&outputs) {
        super::save_frame(path, frame)?;
        trace!(path = %path.display(), "frame written");
    }

    if verbose > 0 {
        println!("Done.");
    }

    Ok(())
}
