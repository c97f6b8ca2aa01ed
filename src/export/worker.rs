use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use super::{export, ExportError, ExportResult, ExportedImage};
use crate::render::{Compositor, SourceImage};
use crate::scene::{ExportSettings, Scene};

/// How often a host loop should poll a running job.
pub const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(24);

pub(crate) fn spawn_worker<T, W>(work: W) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<T>();
    std::thread::spawn(move || {
        let result = work();
        let _ = tx.send(result);
    });
    rx
}

#[derive(Debug)]
pub enum JobStatus {
    Pending,
    Done(ExportResult<ExportedImage>),
}

/// Export running on a worker thread against a snapshot of the scene.
///
/// Dropping the job cancels it; a cancelled job reports
/// [`ExportError::Cancelled`] instead of its bytes.
#[derive(Debug)]
pub struct ExportJob {
    rx: mpsc::Receiver<ExportResult<ExportedImage>>,
    cancel: Arc<AtomicBool>,
}

impl ExportJob {
    pub fn spawn(mut compositor: Compositor, scene: Scene, source: Arc<SourceImage>) -> Self {
        let settings = *scene.export_settings();
        let revision = scene.revision();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let rx = spawn_worker(move || run(&flag, &mut compositor, &scene, &source, &settings));
        tracing::debug!(revision, "export job spawned");
        Self { rx, cancel }
    }

    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::Relaxed) {
            tracing::debug!("export job cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Non-blocking check for the result.
    pub fn poll(&self) -> JobStatus {
        match self.rx.try_recv() {
            Ok(result) => JobStatus::Done(result),
            Err(mpsc::TryRecvError::Empty) => JobStatus::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                JobStatus::Done(Err(ExportError::WorkerDisconnected))
            }
        }
    }

    /// Blocks until the worker reports.
    pub fn wait(self) -> ExportResult<ExportedImage> {
        self.rx
            .recv()
            .unwrap_or(Err(ExportError::WorkerDisconnected))
    }
}

impl Drop for ExportJob {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn run(
    cancel: &AtomicBool,
    compositor: &mut Compositor,
    scene: &Scene,
    source: &SourceImage,
    settings: &ExportSettings,
) -> ExportResult<ExportedImage> {
    if cancel.load(Ordering::Relaxed) {
        return Err(ExportError::Cancelled);
    }
    let result = export(compositor, scene, source, settings);
    if cancel.load(Ordering::Relaxed) {
        return Err(ExportError::Cancelled);
    }
    if let Err(err) = &result {
        tracing::warn!(?err, "export failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;
    use crate::scene::{ExportFormat, PixelMultiplier, ShadowPreset};
    use image::{Rgba, RgbaImage};

    fn job_inputs() -> (Scene, Arc<SourceImage>) {
        let mut scene = Scene::new();
        scene.set_window_visible(false);
        scene.apply_shadow_preset(ShadowPreset::Off);
        scene.set_padding(4, 4);
        scene.set_solid_background(Color::WHITE);
        scene.set_export_settings(ExportSettings::new(
            ExportFormat::Png,
            1.0,
            PixelMultiplier::X1,
        ));
        let image = RgbaImage::from_pixel(16, 12, Rgba([200, 10, 10, 255]));
        let source = SourceImage::from_rgba(&image).expect("source");
        (scene, Arc::new(source))
    }

    #[test]
    fn spawned_job_reports_through_poll() {
        let (scene, source) = job_inputs();
        let job = ExportJob::spawn(Compositor::default(), scene, source);
        let result = loop {
            match job.poll() {
                JobStatus::Pending => std::thread::sleep(EXPORT_POLL_INTERVAL),
                JobStatus::Done(result) => break result,
            }
        };
        let exported = result.expect("export");
        assert_eq!((exported.width, exported.height), (24, 20));
        assert!(!job.is_cancelled());
    }

    #[test]
    fn wait_blocks_for_result() {
        let (scene, source) = job_inputs();
        let job = ExportJob::spawn(Compositor::default(), scene, source);
        let exported = job.wait().expect("export");
        assert_eq!(exported.format, ExportFormat::Png);
    }

    #[test]
    fn cancelled_flag_short_circuits_run() {
        let (scene, source) = job_inputs();
        let settings = *scene.export_settings();
        let flag = AtomicBool::new(true);
        let mut compositor = Compositor::default();
        let err = run(&flag, &mut compositor, &scene, &source, &settings).expect_err("cancelled");
        assert!(matches!(err, ExportError::Cancelled));
    }

    #[test]
    fn cancel_is_sticky() {
        let (scene, source) = job_inputs();
        let job = ExportJob::spawn(Compositor::default(), scene, source);
        job.cancel();
        job.cancel();
        assert!(job.is_cancelled());
        // Either the worker finished first or it observed the flag.
        match job.wait() {
            Ok(_) | Err(ExportError::Cancelled) => {}
            Err(other) => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn spawn_worker_delivers_value() {
        let rx = spawn_worker(|| 41 + 1);
        assert_eq!(rx.recv().expect("value"), 42);
    }
}
