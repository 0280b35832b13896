use std::path::PathBuf;

use argh::FromArgs;
use viewprep::pipeline::{
    build_reference_model, Pipeline, PipelineConfig, ProcessRunner, SceneLayout,
};

/// Few-view reconstruction staging on top of COLMAP
#[derive(Debug, FromArgs)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Reference(ReferenceArgs),
    Run(RunArgs),
}

/// Build the reference model of a scene from all of its images
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "reference")]
struct ReferenceArgs {
    /// scene directory holding `images/`
    #[argh(option, short = 's')]
    scene: PathBuf,

    /// optional JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

/// Run the few-view reconstruction of a scene
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunArgs {
    /// scene directory holding `images/` and `sparse/0/`
    #[argh(option, short = 's')]
    scene: PathBuf,

    /// number of training views, 0 keeps every non-holdout view
    #[argh(option, short = 'n')]
    n_views: Option<usize>,

    /// optional JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    })
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Command::Reference(args) => {
            let config = load_config(args.config.as_ref())?;
            let scene = std::fs::canonicalize(&args.scene)?;
            let model = build_reference_model(
                &SceneLayout::new(scene),
                &config,
                &mut ProcessRunner,
            )?;
            log::info!("reference model written to {}", model.display());
        }
        Command::Run(args) => {
            let mut config = load_config(args.config.as_ref())?;
            if let Some(n_views) = args.n_views {
                config.n_views = n_views;
            }
            let scene = std::fs::canonicalize(&args.scene)?;
            let report = Pipeline::new(scene, config, ProcessRunner).run()?;
            log::info!(
                "{} training views, {} held out, fused cloud at {}",
                report.split.train.len(),
                report.split.holdout.len(),
                report.fused.display()
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    if let Err(e) = run(args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
