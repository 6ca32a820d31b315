use std::{rc::Rc, time::Duration};

use futures::executor::LocalPool;
use guide_scene_viewer::{
    config::ViewerConfig,
    data_structures::annotation::{Color, InWorldAnnotation},
    error::ViewerError,
    format::schema::TRANSPARENCY_DISABLED,
    viewer::{ModelViewer, ViewerParams, ViewerState},
};

use crate::common::{
    fixture::*,
    test_utils::{FakeHost, MemorySource},
};

mod common;

struct Harness {
    pool: LocalPool,
    source: Rc<MemorySource>,
    host: Rc<FakeHost>,
    viewer: ModelViewer,
}

impl Harness {
    fn new(config: ViewerConfig) -> Self {
        let pool = LocalPool::new();
        let source = MemorySource::new();
        source.insert("scene.bin.gz", SceneSpec::new(vec![MeshSpec::quad(solid("checker.png"))]).to_gzip());
        source.insert("checker.png", checkerboard());
        let host = FakeHost::new(512, 512);
        let viewer = ModelViewer::new(config, source.clone(), host.clone(), Rc::new(pool.spawner()));
        Self {
            pool,
            source,
            host,
            viewer,
        }
    }

    fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    fn zoom(&self) -> f32 {
        self.viewer.with_session(|s| s.camera().zoom).unwrap()
    }
}

fn params(src: &str) -> ViewerParams {
    let mut params = ViewerParams::new(src, 512, 512);
    params.placeholder = "placeholder.png".into();
    params
}

#[test]
fn load_mounts_renderer_into_host() {
    let mut h = Harness::new(ViewerConfig::default());
    assert_eq!(h.viewer.state(), ViewerState::Uninitialized);

    h.viewer.start(params("scene.bin.gz"));
    assert_eq!(h.viewer.state(), ViewerState::Loading);
    assert!(h.viewer.shows_placeholder());

    h.run();
    assert_eq!(h.viewer.state(), ViewerState::Ready);
    assert!(!h.viewer.shows_placeholder());
    assert_eq!(*h.host.attached.borrow(), vec![1]);
    assert_eq!(h.host.observers(), 1);

    let log = h.host.renderer(0);
    assert_eq!(log.borrow().size, [512, 512]);
    assert_eq!(log.borrow().pixel_ratio, 2.0);

    h.viewer.animate(Duration::ZERO);
    h.viewer.animate(Duration::from_millis(16));
    assert_eq!(log.borrow().renders, 2);
}

#[test]
fn failed_fetch_shows_placeholder_with_raw_error() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("missing.bin.gz"));
    h.run();

    assert_eq!(h.viewer.state(), ViewerState::Failed);
    assert!(h.viewer.shows_placeholder());
    assert_eq!(h.viewer.placeholder().as_deref(), Some("placeholder.png"));
    let Some(ViewerError::Transport(err)) = h.viewer.error() else {
        panic!("expected a transport error");
    };
    assert_eq!(err.url, "missing.bin.gz");
    assert!(err.reason.contains("404"));
    assert_eq!(h.host.renderer_count(), 0);
}

#[test]
fn superseded_load_is_silently_discarded() {
    let mut h = Harness::new(ViewerConfig::default());
    h.source.insert("slow.bin.gz", SceneSpec::new(vec![MeshSpec::quad(solid("slow.png"))]).to_gzip());
    let gate = h.source.gate("slow.bin.gz");

    h.viewer.start(params("slow.bin.gz"));
    h.run();
    assert_eq!(h.viewer.state(), ViewerState::Loading);

    h.viewer.start(params("scene.bin.gz"));
    h.run();
    assert_eq!(h.viewer.state(), ViewerState::Ready);

    gate.set();
    h.run();
    assert_eq!(h.viewer.state(), ViewerState::Ready);
    assert!(h.viewer.error().is_none());
    assert_eq!(h.host.renderer_count(), 1);
    assert_eq!(h.source.fetches("slow.png"), 0);
}

#[test]
fn dispose_during_load_never_mounts() {
    let mut h = Harness::new(ViewerConfig::default());
    let gate = h.source.gate("scene.bin.gz");
    h.viewer.start(params("scene.bin.gz"));
    h.run();

    h.viewer.dispose();
    gate.set();
    h.run();

    assert_eq!(h.viewer.state(), ViewerState::Disposed);
    assert!(h.viewer.error().is_none());
    assert_eq!(h.host.renderer_count(), 0);
    assert!(h.host.attached.borrow().is_empty());
}

#[test]
fn dispose_releases_everything_once() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("scene.bin.gz"));
    h.run();
    let log = h.host.renderer(0);

    h.viewer.dispose();
    h.viewer.dispose();

    assert_eq!(h.viewer.state(), ViewerState::Disposed);
    assert_eq!(log.borrow().disposes, 1);
    assert_eq!(*h.host.detached.borrow(), vec![1]);
    assert_eq!(h.host.disconnects.get(), 1);
    assert_eq!(h.host.observers(), 0);

    h.viewer.animate(Duration::from_millis(100));
    h.host.resize(100, 100);
    assert_eq!(log.borrow().renders, 0);
    assert_eq!(log.borrow().size, [512, 512]);
}

#[test]
fn restart_tears_down_previous_session_first() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("scene.bin.gz"));
    h.run();
    let first = h.host.renderer(0);

    let mut next = params("scene.bin.gz");
    next.width = 640;
    assert!(h.viewer.update_if_changed(next));
    assert_eq!(first.borrow().disposes, 1);
    h.run();

    assert_eq!(h.viewer.state(), ViewerState::Ready);
    assert_eq!(h.host.renderer_count(), 2);
    assert_eq!(*h.host.attached.borrow(), vec![1, 2]);
    assert_eq!(h.host.observers(), 1);
    assert_eq!(h.source.fetches("checker.png"), 1);
}

#[test]
fn background_change_does_not_reload() {
    let config = ViewerConfig {
        background: Some(Color::WHITE),
        ..ViewerConfig::default()
    };
    let mut h = Harness::new(config);
    let params = params("scene.bin.gz");
    h.viewer.start(params.clone());
    h.run();
    let log = h.host.renderer(0);
    assert_eq!(log.borrow().background, Some(Color::WHITE));

    assert!(!h.viewer.update_if_changed(params.clone()));
    let mut dark = params;
    dark.background = Some(Color::BLACK);
    assert!(!h.viewer.update_if_changed(dark));
    assert_eq!(log.borrow().background, Some(Color::BLACK));
    assert_eq!(h.host.renderer_count(), 1);
}

#[test]
fn resize_reflows_camera_and_surface() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("scene.bin.gz"));
    h.run();
    let before = h.zoom();

    h.host.resize(256, 128);

    let log = h.host.renderer(0);
    assert_eq!(log.borrow().size, [256, 128]);
    let (left, top) = h.viewer.with_session(|s| (s.camera().left, s.camera().top)).unwrap();
    assert_eq!((left, top), (-128.0, 64.0));
    assert!(h.zoom() < before);
}

#[test]
fn zoom_commands_and_reset() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("scene.bin.gz"));
    h.run();
    let initial = h.zoom();

    h.viewer.zoom_in();
    let zoomed_in = h.zoom();
    assert!(zoomed_in > initial);
    assert!(!h.viewer.with_session(|s| s.controls().unwrap().enable_zoom).unwrap());

    h.viewer.zoom_out();
    h.viewer.zoom_out();
    assert!(h.zoom() < initial);

    h.viewer.reset_view();
    assert_eq!(h.zoom(), initial);
}

#[test]
fn static_viewer_has_no_controls() {
    let mut h = Harness::new(ViewerConfig::default());
    let mut params = params("scene.bin.gz");
    params.interactive = false;
    h.viewer.start(params);
    h.run();
    let initial = h.zoom();

    h.viewer.zoom_in();
    assert_eq!(h.zoom(), initial);
    assert!(h.viewer.with_session(|s| s.controls().is_none()).unwrap());
}

#[test]
fn tooltip_follows_pointer_over_annotation() {
    let mut h = Harness::new(ViewerConfig::default());
    let mut params = params("scene.bin.gz");
    params.in_world_annotations = Rc::from(vec![InWorldAnnotation::Box {
        min_corner: [0.0, 0.0, -0.5],
        max_corner: [1.0, 1.0, 0.5],
        color: Color::RED,
        thickness: None,
        content: "Hopper".into(),
        always_on_top: false,
    }]);
    h.viewer.start(params);
    h.run();

    h.viewer.pointer_move(256.0, 256.0);
    h.viewer.animate(Duration::ZERO);
    assert_eq!(h.viewer.tooltip().as_deref(), Some("Hopper"));

    h.viewer.pointer_move(2.0, 2.0);
    h.viewer.animate(Duration::from_millis(16));
    assert_eq!(h.viewer.tooltip(), None);

    h.viewer.pointer_move(256.0, 256.0);
    h.viewer.animate(Duration::from_millis(32));
    h.viewer.pointer_leave();
    assert_eq!(h.viewer.tooltip(), None);
}

#[test]
fn animated_textures_blit_on_ticks() {
    let config = ViewerConfig {
        tick_hz: 20,
        ..ViewerConfig::default()
    };
    let mut h = Harness::new(config);
    let mut scene = SceneSpec::new(vec![MeshSpec::quad(material(
        "rendertype_solid",
        TRANSPARENCY_DISABLED,
        vec![SamplerSpec::new("atlas.png").grouped("atlas")],
    ))]);
    scene.animated_textures.push(AnimationSpec {
        texture_id: "atlas".into(),
        frames_path: "fire.png".into(),
        x: 1,
        y: 0,
        width: 1,
        height: 1,
        frame_count: 2,
        frames_per_row: 1,
        frames: vec![(0, 2), (1, 3)],
    });
    h.source.insert("animated.bin.gz", scene.to_gzip());
    h.source.insert("atlas.png", checkerboard());
    h.source.insert("fire.png", png(1, 2, |_, _| [255, 128, 0, 255]));

    h.viewer.start(params("animated.bin.gz"));
    h.run();
    h.viewer.animate(Duration::ZERO);
    h.viewer.animate(Duration::from_millis(120));

    let log = h.host.renderer(0);
    let blits = log.borrow().blits.clone();
    assert_eq!(
        blits,
        vec![
            ("fire.png#0".to_string(), "atlas.png".to_string(), 1, 0),
            ("fire.png#0".to_string(), "atlas.png".to_string(), 1, 0),
        ]
    );
}

#[test]
fn dropping_the_viewer_tears_down() {
    let mut h = Harness::new(ViewerConfig::default());
    h.viewer.start(params("scene.bin.gz"));
    h.run();
    let log = h.host.renderer(0);
    let host = h.host.clone();

    drop(h);
    assert_eq!(log.borrow().disposes, 1);
    assert_eq!(host.observers(), 0);
}

#[test]
fn viewers_can_share_decoded_textures() {
    let mut h = Harness::new(ViewerConfig::default());
    let other_host = FakeHost::new(256, 256);
    let other = ModelViewer::with_textures(
        ViewerConfig::default(),
        h.viewer.textures(),
        other_host.clone(),
        Rc::new(h.pool.spawner()),
    );

    h.viewer.start(params("scene.bin.gz"));
    other.start(params("scene.bin.gz"));
    h.run();

    assert_eq!(other.state(), ViewerState::Ready);
    assert_eq!(h.source.fetches("checker.png"), 1);
    assert_eq!(h.source.fetches("scene.bin.gz"), 2);
}
