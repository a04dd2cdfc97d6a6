use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use facemesh_core::capture::infrastructure::ffmpeg_capture::{
    CaptureOptions, CaptureTarget, FfmpegCapture,
};
use facemesh_core::detection::domain::detector_settings::{DetectionMode, DetectorSettings};
use facemesh_core::detection::infrastructure::face_mesh_detector::FaceMeshDetector;
use facemesh_core::detection::infrastructure::model_resolver::{self, ModelRequest};
use facemesh_core::display::infrastructure::highgui_window::HighguiWindow;
use facemesh_core::pipeline::live_mesh_use_case::{LiveMeshUseCase, Termination};
use facemesh_core::pipeline::mesh_settings::MeshSettings;
use facemesh_core::pipeline::pipeline_logger::StatsPipelineLogger;
use facemesh_core::rendering::domain::drawing_style::DrawingStyle;
use facemesh_core::rendering::domain::mesh_topology::{MeshTopology, TopologyError};
use facemesh_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_EXIT_KEY, DEFAULT_MAX_FACES, DEFAULT_MIN_DETECTION_CONFIDENCE,
    DEFAULT_MIN_TRACKING_CONFIDENCE, DEFAULT_POLL_MS, DEFAULT_WINDOW_TITLE,
    FACE_DETECTOR_MODEL_NAME, FACE_LANDMARK_MODEL_NAME,
};

const AFTER_HELP: &str = "\
Models are not bundled. Each model is looked up as --face-detector-model / \
--landmark-model, then in the user cache directory, then in --models-dir, and \
is downloaded into the cache only when --face-detector-url / --landmark-url is \
given. Without any of these, startup fails with a list of the searched paths.

Expected file names: face_detection_short_range.onnx, face_landmark.onnx.
The default --topology tessellation reads face_mesh_tessellation.json \
(a JSON list of [start, end] pairs) from --models-dir and draws contours \
when that file is missing.";

/// Live face mesh overlay from a camera.
#[derive(Parser)]
#[command(name = "facemesh", after_help = AFTER_HELP)]
struct Cli {
    /// Camera index.
    #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX)]
    camera: u32,

    /// Platform device string; overrides --camera.
    #[arg(long, conflicts_with = "input")]
    device: Option<String>,

    /// Read a video or image file instead of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Requested capture width (needs --height).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Requested capture height (needs --width).
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Requested capture frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Minimum face detection score (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_DETECTION_CONFIDENCE)]
    min_detection_confidence: f64,

    /// Minimum landmark presence score to keep tracking a face (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_TRACKING_CONFIDENCE)]
    min_tracking_confidence: f64,

    /// Reuse the previous frame's face region instead of detecting every frame.
    #[arg(long)]
    tracking: bool,

    /// Maximum number of faces to mesh.
    #[arg(long, default_value_t = DEFAULT_MAX_FACES)]
    max_faces: usize,

    /// Connections to draw: tessellation, contours, irises, or a JSON file of [start, end] pairs.
    #[arg(long, default_value = "tessellation")]
    topology: String,

    /// Window title.
    #[arg(long, default_value = DEFAULT_WINDOW_TITLE)]
    window_title: String,

    /// Key code that closes the window (27 = Esc).
    #[arg(long, default_value_t = DEFAULT_EXIT_KEY, allow_negative_numbers = true)]
    exit_key: i32,

    /// Key poll timeout per frame in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    poll_ms: u32,

    /// BlazeFace short-range ONNX model.
    #[arg(long)]
    face_detector_model: Option<PathBuf>,

    /// Face landmark ONNX model.
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Download URL used when the face detector model is not found locally.
    #[arg(long)]
    face_detector_url: Option<String>,

    /// Download URL used when the landmark model is not found locally.
    #[arg(long)]
    landmark_url: Option<String>,

    /// Directory searched for models and the tessellation file after the user cache.
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = build_settings(&cli);
    settings.validate()?;
    let topology = load_topology(&cli.topology, &cli.models_dir)?;

    let detector = build_detector(&cli, settings.detector.clone())?;
    let capture = FfmpegCapture::open(&capture_target(&cli), &capture_options(&cli))?;

    let mut use_case = LiveMeshUseCase::new(
        Box::new(capture),
        Box::new(detector),
        Box::new(HighguiWindow::new()),
        topology,
        settings,
        Box::new(StatsPipelineLogger::default()),
    );

    match use_case.run()? {
        Termination::CaptureFailed => log::info!("Capture ended"),
        Termination::ExitRequested => log::info!("Closed by user"),
    }
    Ok(())
}

fn build_settings(cli: &Cli) -> MeshSettings {
    MeshSettings {
        detector: DetectorSettings {
            mode: if cli.tracking {
                DetectionMode::Tracking
            } else {
                DetectionMode::StaticImage
            },
            min_detection_confidence: cli.min_detection_confidence,
            min_tracking_confidence: cli.min_tracking_confidence,
            max_faces: cli.max_faces,
        },
        style: DrawingStyle::default(),
        window_title: cli.window_title.clone(),
        exit_key: cli.exit_key,
        poll_ms: cli.poll_ms,
    }
}

fn load_topology(choice: &str, models_dir: &Path) -> Result<MeshTopology, TopologyError> {
    match choice {
        "tessellation" => MeshTopology::tessellation_in(models_dir),
        "contours" => Ok(MeshTopology::contours()),
        "irises" => Ok(MeshTopology::contours_with_irises()),
        path => MeshTopology::from_json_file(Path::new(path)),
    }
}

fn capture_target(cli: &Cli) -> CaptureTarget {
    if let Some(path) = &cli.input {
        CaptureTarget::File(path.clone())
    } else if let Some(device) = &cli.device {
        CaptureTarget::Device(device.clone())
    } else {
        CaptureTarget::Camera(cli.camera)
    }
}

fn capture_options(cli: &Cli) -> CaptureOptions {
    CaptureOptions {
        size: cli.width.zip(cli.height),
        fps: cli.fps,
    }
}

fn build_detector(
    cli: &Cli,
    settings: DetectorSettings,
) -> Result<FaceMeshDetector, Box<dyn std::error::Error>> {
    let face_detector_model = resolve_model(
        FACE_DETECTOR_MODEL_NAME,
        cli.face_detector_model.as_deref(),
        &cli.models_dir,
        cli.face_detector_url.as_deref(),
    )?;
    let landmark_model = resolve_model(
        FACE_LANDMARK_MODEL_NAME,
        cli.landmark_model.as_deref(),
        &cli.models_dir,
        cli.landmark_url.as_deref(),
    )?;
    FaceMeshDetector::from_models(&face_detector_model, &landmark_model, settings)
}

fn resolve_model(
    name: &str,
    explicit: Option<&Path>,
    bundled_dir: &Path,
    url: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let request = ModelRequest {
        name,
        explicit,
        bundled_dir: Some(bundled_dir),
        url,
    };
    let label = name.to_string();
    let path = model_resolver::resolve(
        &request,
        Some(Box::new(move |downloaded, total| {
            download_progress(&label, downloaded, total)
        })),
    )?;
    if url.is_some() {
        eprintln!();
    }
    log::info!("Using {}", path.display());
    Ok(path)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
