use anyhow::{Context, Result, ensure};
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Icons embedded into the crate for overlay markers.
const BUILT_IN_ICONS: [&str; 2] = ["diamond.png", "diamond_colored.png"];

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");
    println!("cargo:rerun-if-changed=schema/scene.fbs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    for icon in BUILT_IN_ICONS {
        ensure!(
            assets_src.join(icon).is_file(),
            "built-in icon assets/{icon} is missing"
        );
    }

    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], &out_dir, &copy_options)
        .with_context(|| format!("copying assets into {out_dir}"))?;

    Ok(())
}
