//! Native device capture using nokhwa (camera) and cpal (microphone)
//!
//! Each acquired device runs on its own capture thread. The thread opens the
//! device, reports back once frames are flowing, and keeps the device open
//! until the handle is released.

use super::traits::{CaptureHandle, DeviceCapture, TrackId, TrackKind, TrackRef};
use crate::utils::error::DeviceError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

type Ready = oneshot::Sender<Result<(), DeviceError>>;

/// Capture backed by the platform's default devices
#[derive(Debug, Clone, Default)]
pub struct NativeCapture {
    /// Camera index or name (None = first camera)
    camera_id: Option<String>,
}

impl NativeCapture {
    pub fn new(camera_id: Option<String>) -> Self {
        Self { camera_id }
    }

    fn camera_index(&self) -> CameraIndex {
        match &self.camera_id {
            Some(id) => match id.parse::<u32>() {
                Ok(idx) => CameraIndex::Index(idx),
                Err(_) => CameraIndex::String(id.clone()),
            },
            None => CameraIndex::Index(0),
        }
    }
}

fn capture_failed(kind: TrackKind, message: impl ToString) -> DeviceError {
    let message = message.to_string();
    if message.to_lowercase().contains("permission") {
        DeviceError::PermissionDenied(kind)
    } else {
        DeviceError::CaptureFailed { kind, message }
    }
}

/// Start a capture thread and wait until it reports the device open
async fn spawn_capture<F>(kind: TrackKind, body: F) -> Result<Box<dyn CaptureHandle>, DeviceError>
where
    F: FnOnce(Arc<AtomicBool>, Ready) + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = oneshot::channel();

    let thread = std::thread::Builder::new()
        .name(format!("{kind}-capture"))
        .spawn({
            let running = running.clone();
            move || body(running, ready_tx)
        })
        .map_err(|e| capture_failed(kind, e))?;

    let outcome = match ready_rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(capture_failed(kind, "capture thread exited before the device opened")),
    };

    if let Err(e) = outcome {
        running.store(false, Ordering::SeqCst);
        let _ = thread.join();
        return Err(e);
    }

    let track = TrackRef::new(TrackId::generate(), kind);
    tracing::info!("{} capture started ({})", kind.device_name(), track.id);

    Ok(Box::new(ThreadCaptureHandle {
        track,
        running,
        thread: Some(thread),
    }))
}

#[async_trait]
impl DeviceCapture for NativeCapture {
    async fn acquire_camera(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| capture_failed(TrackKind::Video, e))?;
        if cameras.is_empty() {
            return Err(DeviceError::NotFound(TrackKind::Video));
        }

        let index = self.camera_index();
        spawn_capture(TrackKind::Video, move |running, ready| run_camera(index, running, ready)).await
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        if cpal::default_host().default_input_device().is_none() {
            return Err(DeviceError::NotFound(TrackKind::Audio));
        }

        spawn_capture(TrackKind::Audio, run_microphone).await
    }
}

fn run_camera(index: CameraIndex, running: Arc<AtomicBool>, ready: Ready) {
    let format = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

    let mut camera = match Camera::new(index.clone(), format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(capture_failed(TrackKind::Video, e)));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(capture_failed(TrackKind::Video, e)));
        return;
    }

    let camera_format = camera.camera_format();
    tracing::debug!(
        "Camera {:?} opened: {}x{} @ {}fps, format={:?}",
        index,
        camera_format.resolution().width(),
        camera_format.resolution().height(),
        camera_format.frame_rate(),
        camera_format.format()
    );
    let _ = ready.send(Ok(()));

    let mut frames: u64 = 0;
    while running.load(Ordering::SeqCst) {
        // Blocks until the camera delivers the next frame
        match camera.frame() {
            Ok(_) => frames += 1,
            Err(e) => {
                tracing::warn!("Camera frame error: {:?}", e);
                break;
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("Failed to stop camera stream: {:?}", e);
    }
    tracing::debug!("Camera capture stopped after {} frames", frames);
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<AtomicU64>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            samples.fetch_add(data.len() as u64, Ordering::Relaxed);
        },
        |err| tracing::error!("Microphone stream error: {}", err),
        None,
    )
}

fn run_microphone(running: Arc<AtomicBool>, ready: Ready) {
    let fail = |ready: Ready, message: String| {
        let _ = ready.send(Err(capture_failed(TrackKind::Audio, message)));
    };

    let Some(device) = cpal::default_host().default_input_device() else {
        let _ = ready.send(Err(DeviceError::NotFound(TrackKind::Audio)));
        return;
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => return fail(ready, e.to_string()),
    };
    let config = supported.config();
    let samples = Arc::new(AtomicU64::new(0));

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_input::<f32>(&device, &config, samples.clone()),
        cpal::SampleFormat::I16 => build_input::<i16>(&device, &config, samples.clone()),
        cpal::SampleFormat::U16 => build_input::<u16>(&device, &config, samples.clone()),
        other => return fail(ready, format!("unsupported sample format {other:?}")),
    };
    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => return fail(ready, e.to_string()),
    };

    if let Err(e) = stream.play() {
        return fail(ready, e.to_string());
    }

    tracing::debug!(
        "Microphone opened: {} Hz, {} channels",
        config.sample_rate.0,
        config.channels
    );
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    tracing::debug!(
        "Microphone capture stopped after {} samples",
        samples.load(Ordering::Relaxed)
    );
}

/// Handle to a device held open by a capture thread
#[derive(Debug)]
struct ThreadCaptureHandle {
    track: TrackRef,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CaptureHandle for ThreadCaptureHandle {
    fn track(&self) -> &TrackRef {
        &self.track
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("{} capture thread panicked", self.track.kind.device_name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_index_parsing() {
        assert_eq!(NativeCapture::new(None).camera_index(), CameraIndex::Index(0));
        assert_eq!(
            NativeCapture::new(Some("2".to_string())).camera_index(),
            CameraIndex::Index(2)
        );
        assert_eq!(
            NativeCapture::new(Some("FaceTime HD".to_string())).camera_index(),
            CameraIndex::String("FaceTime HD".to_string())
        );
    }

    #[test]
    fn test_permission_messages_map_to_permission_denied() {
        assert_eq!(
            capture_failed(TrackKind::Video, "Permission denied by user"),
            DeviceError::PermissionDenied(TrackKind::Video)
        );
        assert!(matches!(
            capture_failed(TrackKind::Audio, "device busy"),
            DeviceError::CaptureFailed { kind: TrackKind::Audio, .. }
        ));
    }
}
