extern crate env_logger;
extern crate image;
#[macro_use]
extern crate log;
extern crate mimic;

use image::RgbaImage;
use mimic::asset::{AssetMesh, AssetNode, AssetNodeKind};
use mimic::session::Builder;
use mimic::{AssetDocument, AssetLoader, Category, Detection, Detector, HostEvent, MatrixData,
            VideoFrame, VideoSource};
use std::cell::Cell;
use std::env;
use std::sync::Arc;

/// Webcam stand-in producing a new frame every 33 ms.
struct Synthetic {
    time: Cell<f64>,
}

impl VideoSource for Synthetic {
    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn dimensions(&self) -> (u32, u32) {
        (64, 36)
    }

    fn frame(&self) -> Option<VideoFrame> {
        Some(VideoFrame {
            time: self.time.get(),
            image: Arc::new(RgbaImage::new(64, 36)),
        })
    }
}

/// Blinks slowly and nods.
struct Puppeteer;

impl Detector for Puppeteer {
    fn is_ready(&self) -> bool {
        true
    }

    fn detect(&mut self, frame: &VideoFrame, _timestamp_ms: i64) -> mimic::Result<Detection> {
        let t = frame.time as f32;
        let blink = 0.5 + 0.5 * (t * 3.0).sin();
        let nod = 0.2 * (t * 1.5).sin();
        let (s, c) = nod.sin_cos();
        let pose = [
            1.0, 0.0, 0.0, 0.0,
            0.0, c, s, 0.0,
            0.0, -s, c, 0.0,
            0.0, 0.0, -10.0, 1.0,
        ];
        Ok(Detection {
            landmarks: Vec::new(),
            blendshape_categories: vec![vec![
                Category {
                    index: 9,
                    score: blink,
                    category_name: "eyeBlinkLeft".into(),
                    display_name: String::new(),
                },
                Category {
                    index: 10,
                    score: blink,
                    category_name: "eyeBlinkRight".into(),
                    display_name: String::new(),
                },
            ]],
            pose_matrices: vec![MatrixData {
                rows: 4,
                columns: 4,
                data: pose.to_vec(),
            }],
        })
    }
}

/// Serves a tiny face made of a single morphing mesh.
struct BuiltIn;

impl AssetLoader for BuiltIn {
    fn load(&self, url: &str) -> mimic::Result<AssetDocument> {
        let face = AssetMesh::with_targets(Some("Face".into()), vec!["eyeBlinkLeft", "eyeBlinkRight"]);
        let head = AssetNode::new(AssetNodeKind::Bone, Some("Head".into())).with_mesh(face);
        Ok(AssetDocument {
            url: url.to_string(),
            roots: vec![head],
        })
    }
}

fn main() {
    env_logger::init();

    let mut builder = Builder::new();
    builder.dimensions(640, 360).device_pixel_ratio(3.0);
    let url = match env::args().nth(1) {
        Some(path) => path,
        None => {
            builder.loader(Arc::new(BuiltIn));
            "built-in".to_string()
        }
    };
    let mut session = builder.build(mimic::Headless::new());

    let video = Arc::new(Synthetic { time: Cell::new(0.0) });
    let source: Arc<dyn VideoSource> = video.clone();
    session.start(Box::new(Puppeteer));
    session.acquire_video(move || Ok(source));

    if let Err(e) = session.load_avatar_blocking(&url) {
        error!("Giving up: {}", e);
        return;
    }

    let mut frames = 0u32;
    session.runtime_mut().add_callback(move |dt| {
        frames += 1;
        if frames % 60 == 0 {
            info!("{} frames, last delta {:.3}s", frames, dt);
        }
    });

    // Display at 60 Hz, video at 30 Hz.
    for tick in 0 .. 600u32 {
        let time_ms = tick as f64 * 1000.0 / 60.0;
        if tick % 2 == 0 {
            video.time.set(time_ms / 1000.0);
        }
        session.dispatch(HostEvent::VideoFrame).unwrap();
        session.dispatch(HostEvent::DisplayRefresh { time_ms }).unwrap();
        if tick == 300 {
            session.dispatch(HostEvent::Resize { width: 1280, height: 720 }).unwrap();
        }
    }

    let renderer = session.runtime().renderer();
    info!(
        "Rendered {} frames with {} detector calls",
        renderer.frames(),
        session.detection().detections()
    );
    if let Some(avatar) = session.avatar() {
        for mesh in avatar.morph_target_meshes() {
            info!("{:?}", mesh.influences());
        }
    }
}
