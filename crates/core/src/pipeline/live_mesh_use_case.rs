use std::io::{self, Write};
use std::time::Instant;

use crate::capture::domain::capture_source::CaptureSource;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::display::domain::display_sink::DisplaySink;
use crate::rendering::domain::mesh_topology::MeshTopology;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::rendering::infrastructure::frame_canvas::FrameCanvas;
use crate::shared::color_space::convert_color;
use crate::shared::constants::CAPTURE_FAILURE_MESSAGE;
use crate::shared::frame::PixelFormat;

use super::mesh_settings::MeshSettings;
use super::pipeline_logger::PipelineLogger;

/// Why the live loop stopped. Both are normal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    CaptureFailed,
    ExitRequested,
}

/// Capture, detect, draw and display until capture fails or the exit key
/// is pressed.
///
/// Owns its devices and releases them exactly once: after `run` returns,
/// whether normally or with an error, or on drop if `run` never finished.
pub struct LiveMeshUseCase {
    capture: Box<dyn CaptureSource>,
    detector: Box<dyn LandmarkDetector>,
    display: Box<dyn DisplaySink>,
    renderer: OverlayRenderer,
    topology: MeshTopology,
    settings: MeshSettings,
    logger: Box<dyn PipelineLogger>,
    diagnostics: Box<dyn Write>,
    released: bool,
}

impl LiveMeshUseCase {
    pub fn new(
        capture: Box<dyn CaptureSource>,
        detector: Box<dyn LandmarkDetector>,
        display: Box<dyn DisplaySink>,
        topology: MeshTopology,
        settings: MeshSettings,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            capture,
            detector,
            display,
            renderer: OverlayRenderer::new(settings.style),
            topology,
            settings,
            logger,
            diagnostics: Box::new(io::stdout()),
            released: false,
        }
    }

    /// Redirects the capture-failure message, stdout by default.
    pub fn with_diagnostics(mut self, out: Box<dyn Write>) -> Self {
        self.diagnostics = out;
        self
    }

    pub fn run(&mut self) -> Result<Termination, Box<dyn std::error::Error>> {
        if self.released {
            return Err("Live loop already ran".into());
        }
        let result = self.run_loop();
        self.release();
        self.logger.summary();
        result
    }

    fn run_loop(&mut self) -> Result<Termination, Box<dyn std::error::Error>> {
        loop {
            let t = Instant::now();
            let Some(mut frame) = self.capture.read_frame() else {
                writeln!(self.diagnostics, "{CAPTURE_FAILURE_MESSAGE}")?;
                self.diagnostics.flush()?;
                return Ok(Termination::CaptureFailed);
            };
            self.logger.timing("capture", elapsed_ms(t));

            let t = Instant::now();
            let rgb = convert_color(&frame, PixelFormat::Rgb);
            self.logger.timing("convert", elapsed_ms(t));

            let t = Instant::now();
            let faces = self.detector.detect(&rgb)?;
            self.logger.timing("detect", elapsed_ms(t));
            self.logger.metric("faces", faces.len() as f64);

            if !faces.is_empty() {
                let t = Instant::now();
                let mut canvas = FrameCanvas::new(&mut frame)?;
                self.renderer.draw(&mut canvas, &faces, &self.topology)?;
                canvas.finish()?;
                self.logger.timing("draw", elapsed_ms(t));
            }

            let t = Instant::now();
            self.display.show(&self.settings.window_title, &frame)?;
            let key = self.display.poll_key(self.settings.poll_ms)?;
            self.logger.timing("display", elapsed_ms(t));

            self.logger.frame_done(frame.index());

            if key == Some(self.settings.exit_key) {
                self.logger.info("Exit key pressed");
                return Ok(Termination::ExitRequested);
            }
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.capture.release();
        self.display.close_all();
    }
}

impl Drop for LiveMeshUseCase {
    fn drop(&mut self) {
        self.release();
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
