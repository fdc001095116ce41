//! I/O engine tests against the in-memory backend

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{collect_reports, test_device_info, MockDevice, MockOpener, MockState, SharedState};
use djhid_descriptor::ReportType;
use djhid_transport::{
    open_with_fallback, ControllerState, DeviceHandle, EngineConfig, HidController, InputPoller,
    InputReport, OpenStrategy, OutputReportFifo, TransportError,
};
use parking_lot::Mutex;

fn shared_state() -> SharedState {
    Arc::new(Mutex::new(MockState::default()))
}

fn mock_device(state: &SharedState) -> Mutex<Box<dyn DeviceHandle>> {
    Mutex::new(Box::new(MockDevice {
        state: state.clone(),
    }))
}

fn test_config() -> EngineConfig {
    EngineConfig {
        boost_reader_priority: false,
        ..Default::default()
    }
}

#[test]
fn test_open_falls_back_to_serial() {
    let state = shared_state();
    let opener = MockOpener {
        path_ok: false,
        ..MockOpener::new(state.clone())
    };
    let mut controller = HidController::with_config(test_device_info(), test_config());

    let strategy = controller.open(&opener).unwrap();
    assert_eq!(strategy, OpenStrategy::SerialNumber);
    assert_eq!(controller.state(), ControllerState::Open);
    assert_eq!(controller.open_strategy(), Some(OpenStrategy::SerialNumber));
    assert_eq!(*opener.attempts.lock(), vec!["path", "serial"]);
    assert_eq!(state.lock().blocking_modes, vec![false]);

    controller.close();
    assert_eq!(controller.state(), ControllerState::Closed);
    assert_eq!(controller.open_strategy(), None);
}

#[test]
fn test_open_fails_when_all_strategies_fail() {
    let state = shared_state();
    let opener = MockOpener {
        path_ok: false,
        serial_ok: false,
        vid_pid_ok: false,
        ..MockOpener::new(state.clone())
    };
    let mut controller = HidController::with_config(test_device_info(), test_config());

    let err = controller.open(&opener).unwrap_err();
    assert!(matches!(err, TransportError::OpenFailed(_)));
    assert_eq!(controller.state(), ControllerState::Closed);
    assert_eq!(controller.open_strategy(), None);
    assert_eq!(*opener.attempts.lock(), vec!["path", "serial", "vid_pid"]);
    // no handle was configured, so no reader could have been started
    assert!(state.lock().blocking_modes.is_empty());
    assert!(!controller.send_output_report(1, &[1]));
}

#[test]
fn test_fallback_skips_missing_path_and_serial() {
    let state = shared_state();
    let opener = MockOpener::new(state);
    let mut info = test_device_info();
    info.path.clear();
    info.serial_number = None;

    let (_, strategy) = open_with_fallback(&opener, &info).unwrap();
    assert_eq!(strategy, OpenStrategy::VendorProduct);
    assert_eq!(*opener.attempts.lock(), vec!["vid_pid"]);
}

#[test]
fn test_open_twice_is_rejected() {
    let state = shared_state();
    let opener = MockOpener::new(state);
    let mut controller = HidController::with_config(test_device_info(), test_config());
    assert_eq!(controller.open(&opener).unwrap(), OpenStrategy::Path);
    assert!(matches!(
        controller.open(&opener),
        Err(TransportError::AlreadyOpen(_))
    ));
    assert!(controller.is_open());
}

#[test]
fn test_reader_delivers_changed_reports() {
    let state = shared_state();
    state.lock().reads.extend([
        Ok(vec![0x01, 0x10, 0x20]),
        Ok(vec![0x01, 0x10, 0x20]),
        Ok(vec![0x01, 0x10, 0x21]),
    ]);
    let opener = MockOpener::new(state.clone());
    let mut controller = HidController::with_config(test_device_info(), test_config());
    let mut rx = controller.subscribe();

    controller.open(&opener).unwrap();
    let reports = collect_reports(&mut rx, 2, Duration::from_secs(5));
    controller.close();

    let data: Vec<Vec<u8>> = reports.iter().map(|r| r.data.clone()).collect();
    assert_eq!(data, vec![vec![0x01, 0x10, 0x20], vec![0x01, 0x10, 0x21]]);
    assert!(reports[0].timestamp <= reports[1].timestamp);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_poll_burst_deduplicates() {
    let state = shared_state();
    let device = mock_device(&state);
    let stop = AtomicBool::new(false);
    let mut poller = InputPoller::new("test", &test_config(), Instant::now());
    let mut delivered: Vec<InputReport> = Vec::new();

    state
        .lock()
        .reads
        .extend([Ok(vec![0x02, 0x7F]), Ok(vec![0x02, 0x7F])]);
    assert_eq!(poller.poll_burst(&device, &stop, |r| delivered.push(r)), 1);

    state
        .lock()
        .reads
        .extend([Ok(vec![0x02, 0x7F]), Ok(vec![0x02, 0x80])]);
    assert_eq!(poller.poll_burst(&device, &stop, |r| delivered.push(r)), 1);

    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1].data, vec![0x02, 0x80]);
}

#[test]
fn test_poll_burst_stops_on_error_and_recovers() {
    let state = shared_state();
    let device = mock_device(&state);
    let stop = AtomicBool::new(false);
    let mut poller = InputPoller::new("test", &test_config(), Instant::now());

    state
        .lock()
        .reads
        .extend([Err("device gone".to_string()), Ok(vec![0x05])]);
    assert_eq!(poller.poll_burst(&device, &stop, |_| {}), 0);
    assert_eq!(poller.poll_burst(&device, &stop, |_| {}), 1);
}

#[test]
fn test_poll_burst_respects_limit_and_stop() {
    let state = shared_state();
    let device = mock_device(&state);
    let config = EngineConfig {
        max_reads_per_burst: 2,
        ..test_config()
    };
    let mut poller = InputPoller::new("test", &config, Instant::now());
    state
        .lock()
        .reads
        .extend((0..5u8).map(|i| Ok(vec![i])));

    assert_eq!(poller.poll_burst(&device, &AtomicBool::new(false), |_| {}), 2);
    assert_eq!(poller.poll_burst(&device, &AtomicBool::new(true), |_| {}), 0);
    assert_eq!(state.lock().reads.len(), 3);
}

#[test]
fn test_fifo_overflow_drops_newest() {
    let state = shared_state();
    let device = mock_device(&state);
    let fifo = OutputReportFifo::new("test", 32);

    for i in 0..31u8 {
        assert!(fifo.push(0x80, &[i]));
    }
    assert!(!fifo.push(0x80, &[0xFF]));

    let mut scratch = Vec::new();
    while fifo.send_next(&device, &mut scratch) {}

    let expected: Vec<Vec<u8>> = (0..31u8).map(|i| vec![0x80, i]).collect();
    assert_eq!(state.lock().writes, expected);
    assert!(!fifo.send_next(&device, &mut scratch));
}

#[test]
fn test_fifo_write_failure_still_consumes() {
    let state = shared_state();
    state.lock().fail_writes = true;
    let device = mock_device(&state);
    let fifo = OutputReportFifo::new("test", 4);
    fifo.push(1, &[1]);

    let mut scratch = Vec::new();
    assert!(fifo.send_next(&device, &mut scratch));
    assert!(fifo.is_empty());
}

#[test]
fn test_close_flushes_output_reports_in_order() {
    let state = shared_state();
    let opener = MockOpener::new(state.clone());
    let mut controller = HidController::with_config(test_device_info(), test_config());
    controller.open(&opener).unwrap();

    assert!(controller.send_output_report(0x80, &[1, 2]));
    assert!(controller.send_output_report(0x81, &[3]));
    controller
        .send_report(ReportType::Output, 0x80, &[4, 5])
        .unwrap();
    controller.close();

    let state = state.lock();
    assert_eq!(
        state.writes,
        vec![vec![0x80, 1, 2], vec![0x81, 3], vec![0x80, 4, 5]]
    );
    // opened non-blocking, forced non-blocking again on close
    assert_eq!(state.blocking_modes, vec![false, false]);
}

#[test]
fn test_latest_output_report_sent_once() {
    let state = shared_state();
    let opener = MockOpener::new(state.clone());
    let mut controller = HidController::with_config(test_device_info(), test_config());
    controller.open(&opener).unwrap();

    assert!(controller.send_output_report_latest(0x90, &[1], false));
    let deadline = Instant::now() + Duration::from_secs(5);
    while state.lock().writes.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(controller.send_output_report_latest(0x90, &[1], false));
    controller.close();

    assert_eq!(state.lock().writes, vec![vec![0x90, 1]]);
}

#[test]
fn test_feature_and_input_reports() {
    let state = shared_state();
    {
        let mut s = state.lock();
        s.feature_reports.insert(0x03, vec![0x03, 0xAA, 0xBB]);
        s.feature_reports.insert(0x04, vec![0x04]);
        s.input_reports.insert(0x01, vec![0x01, 0x11, 0x22]);
    }
    let opener = MockOpener::new(state.clone());
    let mut controller = HidController::with_config(test_device_info(), test_config());
    controller.open(&opener).unwrap();

    assert_eq!(controller.get_feature_report(0x03).unwrap(), vec![0xAA, 0xBB]);
    assert!(controller.get_feature_report(0x04).unwrap().is_empty());
    assert!(controller.get_feature_report(0x05).is_err());
    assert_eq!(
        controller.get_input_report(0x01).unwrap(),
        vec![0x01, 0x11, 0x22]
    );
    assert_eq!(
        controller.read_report(ReportType::Input, 0x01).unwrap(),
        vec![0x11, 0x22]
    );
    assert!(matches!(
        controller.read_report(ReportType::Output, 0x01),
        Err(TransportError::UnsupportedReportType(ReportType::Output, _))
    ));

    controller.send_feature_report(0x03, &[0x01, 0x02]).unwrap();
    controller
        .send_report(ReportType::Feature, 0x04, &[0x09])
        .unwrap();
    assert_eq!(
        state.lock().sent_features,
        vec![vec![0x03, 0x01, 0x02], vec![0x04, 0x09]]
    );
}

#[test]
fn test_report_descriptor_from_device() {
    let state = shared_state();
    state.lock().descriptor = vec![0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, 0xC0];
    let opener = MockOpener::new(state);
    let mut controller = HidController::with_config(test_device_info(), test_config());
    controller.open(&opener).unwrap();
    assert_eq!(
        controller.report_descriptor().unwrap(),
        vec![0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, 0xC0]
    );
}

#[test]
fn test_requests_on_closed_device() {
    let controller = HidController::with_config(test_device_info(), test_config());
    assert!(matches!(
        controller.get_feature_report(1),
        Err(TransportError::NotOpen(_))
    ));
    assert!(matches!(
        controller.send_feature_report(1, &[]),
        Err(TransportError::NotOpen(_))
    ));
    assert!(matches!(
        controller.send_report(ReportType::Output, 1, &[]),
        Err(TransportError::NotOpen(_))
    ));
    assert!(!controller.send_output_report(1, &[0]));
    assert_eq!(controller.name(), "Kontrol Mock FFEE_4");
}

#[test]
#[ignore] // requires hardware
fn test_open_first_hid_device() {
    let api = hidapi::HidApi::new().expect("hidapi init");
    let info = api
        .device_list()
        .next()
        .map(djhid_transport::DeviceInfo::from)
        .expect("no HID device connected");
    let mut controller = HidController::new(info);
    controller.open(&api).expect("open device");
    let descriptor = controller.report_descriptor().expect("report descriptor");
    assert!(!descriptor.is_empty());
}
