//! Runtime tunables of the viewer.
//!
//! Everything here has a default matching the behaviour of the exported-scene
//! viewer on the guide website; a JSON file may override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::data_structures::annotation::Color;

/// Tunables shared by the assembler, the controls and the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Directory scenes, textures and sprite sheets are resolved against.
    pub asset_base_url: String,
    /// Animated texture cadence, independent of the render frame rate.
    pub tick_hz: u32,
    /// Upper bound of ticks replayed in one frame after a long stall.
    pub max_catch_up_ticks: u32,
    /// Synthetic wheel steps issued by one zoom command.
    pub zoom_steps: u32,
    pub zoom_wheel_delta: f32,
    pub zoom_speed: f32,
    /// Viewports narrower than `declared width * viewport_scale_divisor` are zoomed out
    /// proportionally. Never zooms in.
    pub viewport_scale_divisor: f32,
    pub camera_distance: f32,
    /// Extra size added to the horizontal extent of the model for the grid helper.
    pub grid_margin: f32,
    pub marker_icon: String,
    pub marker_icon_tinted: String,
    pub show_axes: bool,
    /// Orbit damping factor, `None` disables inertia.
    pub damping: Option<f32>,
    pub background: Option<Color>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_base_url: String::new(),
            tick_hz: 20,
            max_catch_up_ticks: 5,
            zoom_steps: 5,
            zoom_wheel_delta: 120.0,
            zoom_speed: 1.0,
            viewport_scale_divisor: 3.0,
            camera_distance: 15.0,
            grid_margin: 2.0,
            marker_icon: "assets/diamond.png".to_string(),
            marker_icon_tinted: "assets/diamond_colored.png".to_string(),
            show_axes: false,
            damping: None,
            background: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json_str(r#"{"tickHz": 10, "showAxes": true}"#).unwrap();
        assert_eq!(config.tick_hz, 10);
        assert!(config.show_axes);
        assert_eq!(config.zoom_steps, 5);
        assert_eq!(config.tick_duration().as_millis(), 100);
    }
}
