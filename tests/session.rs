extern crate image;
extern crate mimic;

use image::RgbaImage;
use mimic::asset::{AssetMesh, AssetNode, AssetNodeKind};
use mimic::session::Builder;
use mimic::{ApplyMode, AssetDocument, AssetLoader, Category, Detection, Detector, DrawKind, Error,
            Headless, HostEvent, LoopState, MatrixData, Object, RetargetConfig, Session, VideoFrame,
            VideoSource};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

struct Clock {
    time: Cell<f64>,
}

impl Clock {
    fn advance(&self) {
        self.time.set(self.time.get() + 1.0 / 30.0);
    }
}

impl VideoSource for Clock {
    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn dimensions(&self) -> (u32, u32) {
        (4, 3)
    }

    fn frame(&self) -> Option<VideoFrame> {
        Some(VideoFrame {
            time: self.time.get(),
            image: Arc::new(RgbaImage::new(4, 3)),
        })
    }
}

#[derive(Clone, Default)]
struct Script {
    calls: Rc<Cell<usize>>,
    response: Rc<RefCell<Detection>>,
}

impl Script {
    fn respond(&self, scores: &[(&str, f32)], pose: Option<&[f32]>) {
        *self.response.borrow_mut() = Detection {
            landmarks: Vec::new(),
            blendshape_categories: vec![
                scores
                    .iter()
                    .enumerate()
                    .map(|(index, &(name, score))| Category {
                        index: index as i32,
                        score,
                        category_name: name.to_string(),
                        display_name: String::new(),
                    })
                    .collect(),
            ],
            pose_matrices: pose
                .map(|data| vec![MatrixData { rows: 4, columns: 4, data: data.to_vec() }])
                .unwrap_or_default(),
        };
    }
}

impl Detector for Script {
    fn is_ready(&self) -> bool {
        true
    }

    fn detect(&mut self, _: &VideoFrame, _: i64) -> mimic::Result<Detection> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.response.borrow().clone())
    }
}

/// Serves documents from memory.
struct Library {
    documents: HashMap<String, AssetDocument>,
}

impl AssetLoader for Library {
    fn load(&self, url: &str) -> mimic::Result<AssetDocument> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| Error::UnsupportedUrl(url.to_string()))
    }
}

fn avatar(url: &str, meshes: &[(&str, &[&str])]) -> AssetDocument {
    let mut head = AssetNode::new(AssetNodeKind::Bone, Some("Head".into()));
    for &(name, targets) in meshes {
        head = head.with_mesh(AssetMesh::with_targets(Some(name.into()), targets.iter().cloned()));
    }
    let hips = AssetNode::new(AssetNodeKind::Bone, Some("Hips".into())).with_child(head);
    AssetDocument {
        url: url.to_string(),
        roots: vec![AssetNode::new(AssetNodeKind::Group, Some("Armature".into())).with_child(hips)],
    }
}

fn library() -> Arc<Library> {
    let mut documents = HashMap::new();
    documents.insert(
        "first".to_string(),
        avatar("first", &[
            ("Face", &["browInnerUp", "jawOpen", "mouthSmile", "eyeBlinkLeft"][..]),
            ("Eyes", &["eyeBlinkRight"][..]),
        ]),
    );
    documents.insert("second".to_string(), avatar("second", &[("Face", &["jawOpen"][..])]));
    Arc::new(Library { documents })
}

struct Fixture {
    session: Session<Headless>,
    video: Arc<Clock>,
    script: Script,
}

impl Fixture {
    fn new(builder: &mut Builder) -> Self {
        let mut session = builder.loader(library()).build(Headless::new());
        let video = Arc::new(Clock { time: Cell::new(0.0) });
        let script = Script::default();
        let source: Arc<dyn VideoSource> = video.clone();
        session.start(Box::new(script.clone()));
        session.acquire_video(move || Ok(source));
        session.load_avatar_blocking("first").unwrap();
        Fixture { session, video, script }
    }

    fn frame(&mut self) -> mimic::Result<()> {
        self.video.advance();
        self.session.dispatch(HostEvent::VideoFrame)
    }

    fn influences(&self) -> Vec<Vec<f32>> {
        let avatar = self.session.avatar().unwrap();
        let scene = self.session.runtime().scene();
        avatar
            .morph_target_meshes()
            .iter()
            .map(|m| m.mesh().sync(scene).influences.unwrap())
            .collect()
    }
}

#[test]
fn session_runs_once_video_and_detector_are_in() {
    let fixture = Fixture::new(&mut Builder::new());
    assert_eq!(fixture.session.state(), LoopState::Running);
    assert_eq!(fixture.session.avatar().unwrap().url(), "first");
}

#[test]
fn identity_pose_is_scaled_on_the_root() {
    let mut builder = Builder::new();
    builder.retarget(RetargetConfig::new(2.0).unwrap());
    let mut fixture = Fixture::new(&mut builder);
    fixture.script.respond(&[], Some(&IDENTITY[..]));

    // Applying twice must not compound the scale.
    fixture.frame().unwrap();
    fixture.frame().unwrap();

    let session = &fixture.session;
    let info = session.avatar().unwrap().root().sync(session.runtime().scene());
    assert!(!info.matrix_auto_update());
    let m = info.matrix;
    assert_eq!((m.x.x, m.y.y, m.z.z, m.w.w), (2.0, 2.0, 2.0, 1.0));
    assert_eq!((m.x.y, m.w.x, m.w.y, m.w.z), (0.0, 0.0, 0.0, 0.0));
}

#[test]
fn blendshapes_reach_every_mesh_with_the_target() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.script.respond(&[("eyeBlinkLeft", 0.8), ("cheekPuff", 0.3)], None);
    fixture.frame().unwrap();
    assert_eq!(fixture.influences(), vec![vec![0.0, 0.0, 0.0, 0.8], vec![0.0]]);

    // Same scores again leave the same state behind.
    fixture.frame().unwrap();
    assert_eq!(fixture.influences(), vec![vec![0.0, 0.0, 0.0, 0.8], vec![0.0]]);

    fixture.script.respond(&[("eyeBlinkRight", 0.5)], None);
    fixture.frame().unwrap();
    assert_eq!(fixture.influences(), vec![vec![0.0, 0.0, 0.0, 0.8], vec![0.5]]);
}

#[test]
fn repeated_video_time_is_detected_once() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.frame().unwrap();
    for _ in 0 .. 3 {
        fixture.session.dispatch(HostEvent::VideoFrame).unwrap();
    }
    assert_eq!(fixture.script.calls.get(), 1);
    assert_eq!(fixture.session.detection().detections(), 1);
}

#[test]
fn toggled_session_ignores_frames() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.session.dispatch(HostEvent::Toggle).unwrap();
    assert_eq!(fixture.session.state(), LoopState::Stopped);
    fixture.frame().unwrap();
    assert_eq!(fixture.script.calls.get(), 0);

    fixture.session.dispatch(HostEvent::Toggle).unwrap();
    fixture.frame().unwrap();
    assert_eq!(fixture.script.calls.get(), 1);
}

#[test]
fn loading_another_avatar_replaces_the_old_one() {
    let mut fixture = Fixture::new(&mut Builder::new());
    let old = fixture.session.avatar().unwrap().meshes()[0].clone();

    fixture.session.load_avatar_blocking("second").unwrap();
    let avatar = fixture.session.avatar().unwrap();
    let scene = fixture.session.runtime().scene();
    assert_eq!(avatar.url(), "second");
    assert!(!scene.contains(&old));
    assert!(scene.contains(&avatar.meshes()[0]));
    assert_eq!(avatar.morph_target_meshes().len(), 1);

    // Detection keeps working against the new model.
    fixture.script.respond(&[("jawOpen", 0.4)], None);
    fixture.frame().unwrap();
    assert_eq!(fixture.influences(), vec![vec![0.4]]);
}

#[test]
fn failed_load_keeps_the_current_avatar() {
    let mut fixture = Fixture::new(&mut Builder::new());
    match fixture.session.load_avatar_blocking("nowhere") {
        Err(Error::UnsupportedUrl(ref url)) => assert_eq!(url, "nowhere"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fixture.session.avatar().unwrap().url(), "first");

    fixture.session.dispatch(HostEvent::LoadAvatar("nowhere".into())).unwrap();
    assert!(fixture.session.is_loading());
    assert!(fixture.session.finish_loading().is_err());
    assert!(!fixture.session.is_loading());
    assert_eq!(fixture.session.avatar().unwrap().url(), "first");
}

#[test]
fn background_load_is_installed_when_done() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.session.dispatch(HostEvent::LoadAvatar("second".into())).unwrap();
    // Until then the old avatar is still there.
    assert_eq!(fixture.session.avatar().unwrap().url(), "first");
    fixture.session.finish_loading().unwrap();
    assert_eq!(fixture.session.avatar().unwrap().url(), "second");
    assert!(fixture.session.finish_loading().is_ok());
}

#[test]
fn resize_renders_exactly_once() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.session.dispatch(HostEvent::DisplayRefresh { time_ms: 0.0 }).unwrap();
    let before = fixture.session.runtime().renderer().frames();

    fixture.session.dispatch(HostEvent::Resize { width: 400, height: 300 }).unwrap();
    let runtime = fixture.session.runtime();
    assert_eq!(runtime.renderer().frames(), before + 1);
    assert_eq!(runtime.renderer().size(), (400, 300));
    assert_eq!(runtime.camera().aspect(), 400.0 / 300.0);
}

#[test]
fn render_mode_applies_on_refresh() {
    let mut builder = Builder::new();
    builder.apply_mode(ApplyMode::Render);
    let mut fixture = Fixture::new(&mut builder);
    fixture.script.respond(&[("jawOpen", 0.6)], None);

    fixture.frame().unwrap();
    assert!(fixture.session.latest_frame().is_some());
    assert_eq!(fixture.influences()[0], vec![0.0; 4]);

    fixture.session.dispatch(HostEvent::DisplayRefresh { time_ms: 16.0 }).unwrap();
    assert!(fixture.session.latest_frame().is_none());
    let frame = fixture.session.runtime().renderer().last_frame().unwrap();
    let face = frame
        .items_of(DrawKind::Mesh)
        .find(|item| item.name.as_ref().map(String::as_str) == Some("Face"))
        .unwrap();
    assert_eq!(**face.influences.as_ref().unwrap(), vec![0.0, 0.6, 0.0, 0.0]);
    assert_eq!(frame.items_of(DrawKind::Background).count(), 1);
}

#[test]
fn missing_camera_leaves_the_session_loading() {
    let mut session = Builder::new().loader(library()).build(Headless::new());
    let script = Script::default();
    session.start(Box::new(script.clone()));
    session.acquire_video(|| Err(Error::Acquire("permission denied".into())));
    assert_eq!(session.state(), LoopState::Loading);

    session.dispatch(HostEvent::VideoFrame).unwrap();
    session.dispatch(HostEvent::DisplayRefresh { time_ms: 0.0 }).unwrap();
    assert_eq!(script.calls.get(), 0);
    assert_eq!(session.runtime().renderer().frames(), 1);
}

#[test]
fn malformed_pose_is_reported() {
    let mut fixture = Fixture::new(&mut Builder::new());
    fixture.script.respond(&[], Some(&IDENTITY[.. 9]));
    match fixture.frame() {
        Err(Error::MalformedMatrix(9)) => {}
        other => panic!("unexpected {:?}", other),
    }
    // The loop survives.
    fixture.script.respond(&[], Some(&IDENTITY[..]));
    assert!(fixture.frame().is_ok());
}

#[test]
fn no_avatar_is_not_an_error() {
    let mut session = Builder::new().loader(library()).build(Headless::new());
    let video = Arc::new(Clock { time: Cell::new(1.0) });
    let source: Arc<dyn VideoSource> = video.clone();
    let script = Script::default();
    script.respond(&[("jawOpen", 1.0)], Some(&IDENTITY[..]));
    session.start(Box::new(script.clone()));
    session.acquire_video(move || Ok(source));
    assert!(session.dispatch(HostEvent::VideoFrame).is_ok());
    assert_eq!(script.calls.get(), 1);
}
