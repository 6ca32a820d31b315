use std::{path::PathBuf, rc::Rc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use guide_scene_viewer::{
    config::ViewerConfig,
    data_structures::annotation::{InWorldAnnotation, OverlayAnnotation},
    flow::{self, ViewOptions},
    resources::fetch::FileSource,
    viewer::ViewerParams,
};

/// View or snapshot exported guidebook scenes.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a window with an orbitable view of the scene.
    View {
        #[command(flatten)]
        scene: SceneArgs,
        /// Disable orbit, zoom and the annotation tooltip.
        #[arg(long = "static")]
        non_interactive: bool,
    },
    /// Render one frame offscreen and write it as PNG.
    Render {
        #[command(flatten)]
        scene: SceneArgs,
        #[arg(long, short)]
        out: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SceneArgs {
    /// Scene path relative to the asset directory.
    scene: String,
    /// Directory scenes and textures are resolved against.
    #[arg(long, default_value = ".")]
    assets: String,
    #[arg(long, default_value_t = 512)]
    width: u32,
    #[arg(long, default_value_t = 512)]
    height: u32,
    /// JSON file with `inWorld` and `overlay` annotation lists.
    #[arg(long)]
    annotations: Option<PathBuf>,
    /// JSON file overriding viewer tunables.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct AnnotationFile {
    in_world: Vec<InWorldAnnotation>,
    overlay: Vec<OverlayAnnotation>,
}

impl SceneArgs {
    fn load(&self) -> anyhow::Result<(ViewerConfig, ViewerParams)> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ViewerConfig::from_json_str(&json)?
            }
            None => ViewerConfig::default(),
        };
        config.asset_base_url = self.assets.clone();

        let annotations = match &self.annotations {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading annotations {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("parsing annotations {}", path.display()))?
            }
            None => AnnotationFile::default(),
        };

        let mut params = ViewerParams::new(self.scene.clone(), self.width, self.height);
        params.in_world_annotations = Rc::from(annotations.in_world);
        params.overlay_annotations = Rc::from(annotations.overlay);
        Ok((config, params))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::View {
            scene,
            non_interactive,
        } => {
            let (config, mut params) = scene.load()?;
            params.interactive = !non_interactive;
            flow::run(ViewOptions {
                config,
                source: Rc::new(FileSource::new(".")),
                params,
            })
        }
        Command::Render { scene, out } => {
            let _ = env_logger::try_init();
            let (config, mut params) = scene.load()?;
            params.interactive = false;
            let image = futures::executor::block_on(flow::render_snapshot(
                &config,
                Rc::new(FileSource::new(".")),
                &params,
            ))?;
            image
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            log::info!("Wrote {}", out.display());
            Ok(())
        }
    }
}
