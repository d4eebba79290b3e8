//! Driver behaviour against the simulated CCDSoft automation object.

use obs_core::capabilities::{
    acquire, CameraInfo, FanControl, ImagingCamera, TemperatureControl,
};
use obs_core::observer::RequestObserver;
use obs_core::storage::{ImageSaver, MemoryImageStore};
use obs_core::{
    AbortSignal, CameraConfig, CameraError, CameraErrorKind, CameraFeature, CameraStatus,
    ImageMetadata, ImageProxy, ImageRequest, PixelBuffer, Shutter, Window,
};
use obs_driver_ccdsoft::mock::{MockCcdSoft, VendorCall};
use obs_driver_ccdsoft::{CameraCapabilities, CcdSoftCamera};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    ExposeBegin,
    ExposeComplete(CameraStatus),
    ReadoutBegin,
    ReadoutComplete(bool, CameraStatus),
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn expose_begin(&self, _request: &ImageRequest) {
        self.events.lock().push(Event::ExposeBegin);
    }

    fn expose_complete(&self, _request: &ImageRequest, status: CameraStatus) {
        self.events.lock().push(Event::ExposeComplete(status));
    }

    fn readout_begin(&self, _request: &ImageRequest) {
        self.events.lock().push(Event::ReadoutBegin);
    }

    fn readout_complete(&self, proxy: Option<&ImageProxy>, status: CameraStatus) {
        self.events
            .lock()
            .push(Event::ReadoutComplete(proxy.is_some(), status));
    }
}

struct FailingSaver;

#[async_trait::async_trait]
impl ImageSaver for FailingSaver {
    async fn save(
        &self,
        _request: &ImageRequest,
        _pixels: PixelBuffer,
        _metadata: ImageMetadata,
    ) -> anyhow::Result<ImageProxy> {
        anyhow::bail!("disk full")
    }
}

struct Rig {
    camera: Arc<CcdSoftCamera<MockCcdSoft>>,
    mock: MockCcdSoft,
    store: Arc<MemoryImageStore>,
    observer: Arc<RecordingObserver>,
}

fn fast_config() -> CameraConfig {
    CameraConfig {
        min_exptime: 0.001,
        poll_interval: Duration::from_millis(1),
        exposure_timeout_margin: Duration::from_secs(5),
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("obs_driver_ccdsoft=debug")
        .with_test_writer()
        .try_init();
}

fn rig_with(mock: MockCcdSoft, config: CameraConfig, temperature: bool) -> Rig {
    init_tracing();
    let store = Arc::new(MemoryImageStore::new());
    let observer = Arc::new(RecordingObserver::default());
    let capabilities = CameraCapabilities::from_config(&config)
        .with_feature(CameraFeature::TemperatureControl, temperature);
    let camera = CcdSoftCamera::builder(mock.clone())
        .config(config)
        .capabilities(capabilities)
        .image_saver(store.clone())
        .observer(observer.clone())
        .build()
        .unwrap();
    Rig {
        camera: Arc::new(camera),
        mock,
        store,
        observer,
    }
}

async fn started(mock: MockCcdSoft) -> Rig {
    let rig = rig_with(mock, fast_config(), true);
    rig.camera.start().await.unwrap();
    rig.mock.clear_calls();
    rig
}

#[tokio::test]
async fn test_start_connects_asynchronously() {
    let rig = rig_with(MockCcdSoft::new(), fast_config(), true);
    assert!(!rig.camera.is_connected().await);

    rig.camera.start().await.unwrap();
    assert!(rig.camera.is_connected().await);
    assert_eq!(
        rig.mock.calls(),
        vec![VendorCall::Connect, VendorCall::SetAsynchronous(true)]
    );

    rig.camera.stop().await.unwrap();
    assert!(!rig.camera.is_connected().await);
    assert!(!rig.mock.state().connected);
}

#[tokio::test]
async fn test_connect_failure_is_connection_error() {
    let rig = rig_with(MockCcdSoft::new().refusing_connect(), fast_config(), true);
    let err = rig.camera.start().await.unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Connection);
    assert!(!rig.camera.is_connected().await);
}

#[tokio::test]
async fn test_operations_require_connection() {
    let rig = rig_with(MockCcdSoft::new(), fast_config(), true);
    let mut request = ImageRequest::new(1.0);

    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Connection);

    let err = rig.camera.temperature().await.unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Connection);
    assert!(rig.mock.calls().is_empty());
}

#[tokio::test]
async fn test_expose_configures_vendor_in_order() {
    let rig = started(MockCcdSoft::new().with_polls_to_complete(Some(2))).await;
    let mut request = ImageRequest::new(2.5).with_binning("3x3");

    let status = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap();
    assert_eq!(status, CameraStatus::Ok);

    let calls = rig.mock.calls();
    assert_eq!(
        calls[..7],
        [
            VendorCall::SetBinX(3),
            VendorCall::SetBinY(3),
            VendorCall::SetSubframe(false),
            VendorCall::SetImageReduction(0),
            VendorCall::SetExposureTime(2.5),
            VendorCall::SetFrame(1),
            VendorCall::TakeImage,
        ]
    );
    assert_eq!(rig.mock.count("IsExposureComplete"), 3);
    assert_eq!(rig.mock.count("Abort"), 0);
    assert_eq!(
        rig.observer.events(),
        vec![Event::ExposeBegin, Event::ExposeComplete(CameraStatus::Ok)]
    );
}

#[tokio::test]
async fn test_closed_shutter_takes_dark_frame() {
    let rig = started(MockCcdSoft::new()).await;
    let mut request = ImageRequest::new(1.0).with_shutter(Shutter::Close);
    rig.camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap();
    assert!(rig.mock.calls().contains(&VendorCall::SetFrame(3)));
    assert_eq!(rig.mock.state().frame, 3);
}

#[tokio::test]
async fn test_leave_as_is_shutter_rejected_without_vendor_calls() {
    let rig = started(MockCcdSoft::new()).await;
    let mut request = ImageRequest::new(1.0).with_shutter(Shutter::LeaveAsIs);

    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Configuration);
    assert!(rig.mock.calls().is_empty());
    assert!(rig.observer.events().is_empty());
}

#[tokio::test]
async fn test_short_exposure_clamped_to_minimum() {
    let rig = started(MockCcdSoft::new()).await;
    let mut request = ImageRequest::new(0.0);
    rig.camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap();

    assert_eq!(request.exptime, 0.001);
    assert!(rig.mock.calls().contains(&VendorCall::SetExposureTime(0.001)));

    let mut long = ImageRequest::new(0.5);
    rig.camera.expose(&mut long, &AbortSignal::new()).await.unwrap();
    assert_eq!(long.exptime, 0.5);
}

#[tokio::test]
async fn test_unknown_binning_rejected() {
    let rig = started(MockCcdSoft::new()).await;
    let mut request = ImageRequest::new(1.0).with_binning("5x5");
    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::CapabilityQuery);
    assert!(rig.mock.calls().is_empty());
}

#[tokio::test]
async fn test_out_of_frame_window_rejected_before_exposure() {
    let rig = started(MockCcdSoft::new().with_sensor(8, 4)).await;
    let mut request = ImageRequest::new(1.0).with_window(Window {
        top: 9000,
        left: 0,
        width: 10,
        height: 10,
    });

    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Configuration);
    assert!(rig.mock.calls().is_empty());
    assert!(rig.observer.events().is_empty());
}

#[tokio::test]
async fn test_window_inside_frame_is_accepted() {
    let rig = started(MockCcdSoft::new()).await;
    let mut request = ImageRequest::new(1.0).with_window(Window {
        top: 10,
        left: 20,
        width: 300,
        height: 400,
    });

    let proxy = acquire(rig.camera.as_ref(), &mut request, &AbortSignal::new())
        .await
        .unwrap();
    assert!(proxy.is_some());
    // Sub-framing is never enabled on the vendor object.
    assert!(rig.mock.calls().contains(&VendorCall::SetSubframe(false)));
    assert!(!rig.mock.state().subframe);
}

#[tokio::test]
async fn test_preset_abort_aborts_once() {
    let rig = started(MockCcdSoft::new().with_polls_to_complete(None)).await;
    let abort = AbortSignal::new();
    abort.set();

    let mut request = ImageRequest::new(1.0);
    let status = rig.camera.expose(&mut request, &abort).await.unwrap();

    assert_eq!(status, CameraStatus::Aborted);
    assert_eq!(rig.mock.count("Abort"), 1);
    assert_eq!(
        rig.observer.events(),
        vec![
            Event::ExposeBegin,
            Event::ExposeComplete(CameraStatus::Aborted)
        ]
    );
}

#[tokio::test]
async fn test_abort_during_exposure() {
    let rig = started(MockCcdSoft::new().with_polls_to_complete(None)).await;
    let abort = AbortSignal::new();

    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.set();
    });

    let mut request = ImageRequest::new(1.0);
    let status = rig.camera.expose(&mut request, &abort).await.unwrap();

    assert_eq!(status, CameraStatus::Aborted);
    assert_eq!(rig.mock.count("Abort"), 1);
    assert!(rig.mock.count("IsExposureComplete") > 1);
}

#[tokio::test]
async fn test_exposure_times_out() {
    let config = CameraConfig {
        exposure_timeout_margin: Duration::from_millis(30),
        ..fast_config()
    };
    let rig = rig_with(MockCcdSoft::new().with_polls_to_complete(None), config, true);
    rig.camera.start().await.unwrap();

    let mut request = ImageRequest::new(0.001);
    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), CameraErrorKind::Timeout);
    assert_eq!(rig.mock.count("Abort"), 1);
    assert_eq!(rig.observer.events(), vec![Event::ExposeBegin]);
}

#[tokio::test]
async fn test_vendor_failure_during_exposure() {
    let rig = started(MockCcdSoft::new().failing_on("TakeImage")).await;
    let mut request = ImageRequest::new(1.0);
    let err = rig
        .camera
        .expose(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();

    match err {
        CameraError::VendorCall { operation, .. } => assert_eq!(operation, "TakeImage"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_readout_transposes_and_stores() {
    // Three columns of two pixels each, J2000.0
    let columns = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
    let mock = MockCcdSoft::new()
        .with_image(columns, 2_451_545.0)
        .with_temperature(-12.5);
    let rig = started(mock).await;

    let mut request = ImageRequest::new(1.0).with_binning("2x2");
    let proxy = acquire(rig.camera.as_ref(), &mut request, &AbortSignal::new())
        .await
        .unwrap()
        .expect("image stored");

    let stored = rig.store.get(&proxy).unwrap();
    assert_eq!(stored.request_id, request.id);
    assert_eq!(stored.pixels.width, 3);
    assert_eq!(stored.pixels.height, 2);
    assert_eq!(stored.pixels.row(0).unwrap(), &[1, 3, 5]);
    assert_eq!(stored.pixels.row(1).unwrap(), &[2, 4, 6]);

    assert_eq!(
        stored.metadata.frame_start_time.to_rfc3339(),
        "2000-01-01T12:00:00+00:00"
    );
    assert_eq!(stored.metadata.frame_temperature, Some(-12.5));
    assert_eq!(stored.metadata.binning_factor, 2);

    let gain = request.header("GAIN").unwrap();
    assert_eq!(gain.value, "UNSET");
    assert_eq!(gain.comment, "Electronic gain in photoelectrons per ADU");
    assert_eq!(stored.headers, request.headers);

    assert_eq!(
        rig.observer.events(),
        vec![
            Event::ExposeBegin,
            Event::ExposeComplete(CameraStatus::Ok),
            Event::ReadoutBegin,
            Event::ReadoutComplete(true, CameraStatus::Ok),
        ]
    );
}

#[tokio::test]
async fn test_readout_aborted_returns_none() {
    let rig = started(MockCcdSoft::new().with_sensor(8, 4)).await;
    let abort = AbortSignal::new();
    let mut request = ImageRequest::new(1.0);
    rig.camera.expose(&mut request, &abort).await.unwrap();

    abort.set();
    let result = rig.camera.readout(&mut request, &abort).await.unwrap();

    assert!(result.is_none());
    assert_eq!(
        rig.observer.events().last(),
        Some(&Event::ReadoutComplete(false, CameraStatus::Aborted))
    );
}

#[tokio::test]
async fn test_readout_storage_failure() {
    let mock = MockCcdSoft::new().with_sensor(8, 4);
    let camera = CcdSoftCamera::builder(mock)
        .config(fast_config())
        .image_saver(Arc::new(FailingSaver))
        .build()
        .unwrap();
    camera.start().await.unwrap();

    let mut request = ImageRequest::new(1.0);
    let err = camera
        .readout(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::Storage);
    camera.stop().await.unwrap();
}

#[tokio::test]
async fn test_readout_rejects_ragged_data_array() {
    let mock = MockCcdSoft::new().with_image(vec![vec![1, 2], vec![3]], 2_451_545.0);
    let rig = started(mock).await;
    let mut request = ImageRequest::new(1.0);
    let err = rig
        .camera
        .readout(&mut request, &AbortSignal::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CameraErrorKind::VendorCall);
    assert!(rig.store.is_empty());
}

#[tokio::test]
async fn test_cooling_sequence() {
    let rig = started(MockCcdSoft::new().with_temperature(15.0)).await;

    assert!(rig.camera.start_cooling(-20.0).await.unwrap());
    assert_eq!(
        rig.mock.calls(),
        vec![
            VendorCall::SetShutdownRegulationOnDisconnect(false),
            VendorCall::SetTemperatureSetPoint(-20.0),
            VendorCall::SetRegulateTemperature(true),
        ]
    );
    assert!(rig.camera.is_cooling().await.unwrap());
    assert_eq!(rig.camera.set_point().await.unwrap(), Some(-20.0));

    let temperature = rig.camera.temperature().await.unwrap().unwrap();
    assert!(temperature < 15.0 && temperature > -20.0);

    assert!(rig.camera.stop_cooling().await.unwrap());
    assert!(!rig.camera.is_cooling().await.unwrap());
}

#[tokio::test]
async fn test_temperature_unsupported_makes_no_vendor_calls() {
    let rig = rig_with(MockCcdSoft::new(), fast_config(), false);
    rig.camera.start().await.unwrap();
    rig.mock.clear_calls();

    assert!(!rig.camera.start_cooling(-10.0).await.unwrap());
    assert!(!rig.camera.stop_cooling().await.unwrap());
    assert!(!rig.camera.is_cooling().await.unwrap());
    assert_eq!(rig.camera.temperature().await.unwrap(), None);
    assert_eq!(rig.camera.set_point().await.unwrap(), None);
    assert!(rig.mock.calls().is_empty());

    let mut request = ImageRequest::new(1.0);
    let proxy = acquire(rig.camera.as_ref(), &mut request, &AbortSignal::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rig.store.get(&proxy).unwrap().metadata.frame_temperature, None);
    assert_eq!(rig.mock.count("Temperature"), 0);
}

#[tokio::test]
async fn test_fan_not_supported() {
    let rig = started(MockCcdSoft::new()).await;
    assert!(!rig.camera.start_fan(Some(1.0)).await.unwrap());
    assert!(!rig.camera.stop_fan().await.unwrap());
    assert!(!rig.camera.is_fanning().await.unwrap());
    assert!(rig.mock.calls().is_empty());
}

#[tokio::test]
async fn test_camera_info_from_config() {
    let config = CameraConfig {
        ccd_width: 2048,
        ccd_height: 1024,
        ..fast_config()
    };
    let rig = rig_with(MockCcdSoft::new(), config, true);
    let camera = rig.camera.as_ref();

    assert_eq!(camera.physical_size(), (2048, 1024));
    assert_eq!(camera.pixel_size(), (9.0, 9.0));
    assert_eq!(camera.overscan_size(None), (0, 0));
    assert_eq!(camera.binnings().len(), 5);
    assert_eq!(camera.binnings()["10x10"], 4);
    assert_eq!(camera.adcs()["12 bits"], 1 << 2);
    assert_eq!(camera.current_ccd().0, 1 << 1);
    assert!(camera.supports(CameraFeature::TemperatureControl));
    assert!(!camera.supports(CameraFeature::ProgrammableFan));

    let info = rig.camera.readout_mode_info(Some("2x2"), None).unwrap();
    assert_eq!((info.width, info.height), (1024, 512));
    assert!(rig.mock.calls().is_empty());
}
