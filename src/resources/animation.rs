//! Sprite-sheet animation of shared texture regions.
//!
//! An animated part owns the cropped frames of one sprite sheet and the list of
//! scene textures (one texture group) whose region at `(x, y)` shows the current
//! frame. Playback advances in fixed ticks driven by [`AnimationClock`], never
//! by the render frame rate.

use std::{rc::Rc, time::Duration};

use crate::{
    cancel::AbortSignal,
    data_structures::{
        document::{AnimatedTextureDescriptor, AnimationFrame},
        texture::{ImageBitmap, SamplerConfig, Texture},
    },
    error::ViewerError,
    resources::{
        fetch::resolve_url,
        material::TextureGroups,
        texture::{TextureManager, decode_image},
    },
};

/// One pending region copy: `frame` goes to `target` at `(x, y)`.
#[derive(Clone, Debug)]
pub struct Blit<'a> {
    pub frame: &'a Texture,
    pub target: &'a Texture,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug)]
pub struct AnimatedTexturePart {
    pub texture_id: String,
    pub targets: Vec<Texture>,
    pub frame_textures: Vec<Texture>,
    pub x: u32,
    pub y: u32,
    pub frames: Vec<AnimationFrame>,
    current: usize,
    sub_frame: u32,
    displayed: Option<u32>,
}

impl AnimatedTexturePart {
    pub fn new(
        texture_id: impl Into<String>,
        targets: Vec<Texture>,
        frame_textures: Vec<Texture>,
        x: u32,
        y: u32,
        frames: Vec<AnimationFrame>,
    ) -> Self {
        Self {
            texture_id: texture_id.into(),
            targets,
            frame_textures,
            x,
            y,
            frames,
            current: 0,
            sub_frame: 0,
            displayed: None,
        }
    }

    /// Advances playback by one tick and returns the blits to perform.
    ///
    /// The frame shown on this tick is the one that was current before the
    /// hold counter advanced, so every frame stays up for exactly its `time`.
    pub fn tick(&mut self) -> Vec<Blit<'_>> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        let shown = self.current;
        self.sub_frame += 1;
        if self.sub_frame >= self.frames[shown].time {
            self.current = (shown + 1) % self.frames.len();
            self.sub_frame = 0;
        }

        let index = self.frames[shown].index;
        self.displayed = Some(index);
        let Some(frame) = self.frame_textures.get(index as usize) else {
            log::warn!("Animated texture {} has no frame {index}", self.texture_id);
            return Vec::new();
        };
        self.targets
            .iter()
            .map(|target| Blit {
                frame,
                target,
                x: self.x,
                y: self.y,
            })
            .collect()
    }

    /// Sprite-sheet frame index shown by the most recent tick.
    pub fn displayed_frame(&self) -> Option<u32> {
        self.displayed
    }
}

/// Fixed-timestep accumulator turning wall-clock time into animation ticks.
///
/// The first tick fires one full period after the clock is started.
#[derive(Clone, Debug)]
pub struct AnimationClock {
    period: Duration,
    max_catch_up: u32,
    last: Option<Duration>,
    accumulated: Duration,
}

impl AnimationClock {
    pub fn new(period: Duration, max_catch_up: u32) -> Self {
        Self {
            period,
            max_catch_up: max_catch_up.max(1),
            last: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Number of ticks due at time `now`. Stalls longer than the catch-up limit
    /// drop the excess instead of fast-forwarding.
    pub fn advance(&mut self, now: Duration) -> u32 {
        let Some(last) = self.last.replace(now) else {
            return 0;
        };
        if self.period.is_zero() {
            return 0;
        }
        self.accumulated += now.saturating_sub(last);
        let mut ticks = 0;
        while self.accumulated >= self.period {
            self.accumulated -= self.period;
            ticks += 1;
        }
        if ticks > self.max_catch_up {
            log::debug!("Dropping {} animation ticks after a stall", ticks - self.max_catch_up);
            ticks = self.max_catch_up;
        }
        ticks
    }
}

/// Splits a sprite sheet into `frame_count` frames, row-major with
/// `frames_per_row` frames per row. Frames outside the sheet are left blank.
pub fn crop_frames(sheet: &ImageBitmap, descriptor: &AnimatedTextureDescriptor) -> Vec<ImageBitmap> {
    let (w, h) = (descriptor.width, descriptor.height);
    let per_row = descriptor.frames_per_row.max(1);
    (0..descriptor.frame_count)
        .map(|i| {
            let fx = (i % per_row) * w;
            let fy = (i / per_row) * h;
            if fx + w <= sheet.width() && fy + h <= sheet.height() {
                image::imageops::crop_imm(sheet, fx, fy, w, h).to_image()
            } else {
                log::warn!("Frame {i} of {} lies outside the sprite sheet", descriptor.frames_path);
                ImageBitmap::new(w, h)
            }
        })
        .collect()
}

/// Builds animated parts for every descriptor whose texture group exists in
/// this scene. Descriptors without a matching group are dropped.
///
/// Sprite sheets are fetched through the texture manager's source. A failed
/// fetch fails the load; an undecodable sheet yields blank frames.
pub async fn load_animated_parts(
    textures: &TextureManager,
    descriptors: &[AnimatedTextureDescriptor],
    groups: &TextureGroups,
    signal: &AbortSignal,
) -> Result<Vec<AnimatedTexturePart>, ViewerError> {
    let mut parts = Vec::new();
    for descriptor in descriptors {
        let Some(targets) = groups.get(&descriptor.texture_id) else {
            log::debug!("No textures in group {}, dropping its animation", descriptor.texture_id);
            continue;
        };
        if descriptor.frames.is_empty() {
            log::warn!("Animated texture {} has no frames", descriptor.texture_id);
            continue;
        }

        signal.check()?;
        let url = resolve_url(textures.base_url(), &descriptor.frames_path);
        let bytes = textures.source().fetch(&url).await?;
        signal.check()?;

        let sheet = decode_image(&bytes, false).unwrap_or_else(|e| {
            log::warn!("Failed to decode sprite sheet {url}: {e}");
            ImageBitmap::new(0, 0)
        });
        let frame_textures = crop_frames(&sheet, descriptor)
            .into_iter()
            .enumerate()
            .map(|(i, frame)| {
                Texture::new(
                    format!("{}#{i}", descriptor.frames_path),
                    Rc::new(frame),
                    SamplerConfig::new(false, false),
                )
            })
            .collect();

        log::debug!(
            "Animating {} texture(s) of group {} with {} frames",
            targets.len(),
            descriptor.texture_id,
            descriptor.frame_count
        );
        parts.push(AnimatedTexturePart::new(
            descriptor.texture_id.clone(),
            targets.clone(),
            frame_textures,
            descriptor.x,
            descriptor.y,
            descriptor.frames.clone(),
        ));
    }
    Ok(parts)
}
