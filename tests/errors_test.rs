#[cfg(test)]
mod error_tests {
    use camera_session::errors::{CameraError, Fault, FaultSink, LogFaults, SessionError};
    use std::error::Error;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_camera_error_initialization() {
        let error = CameraError::InitializationError("Test init error".to_string());
        assert!(error.to_string().contains("Camera initialization error"));
        assert!(error.to_string().contains("Test init error"));
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::CaptureError("Display test".to_string());
        assert_eq!(format!("{}", error), "Capture error: Display test");
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::DeviceUnavailable("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            CameraError::InitializationError("Init error".to_string()),
            CameraError::DeviceUnavailable("Device error".to_string()),
            CameraError::TransactionRejected("Transaction error".to_string()),
            CameraError::ControlError("Control error".to_string()),
            CameraError::CaptureError("Capture error".to_string()),
            CameraError::RecordingError("Recording error".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
            assert!(!format!("{:?}", error).is_empty());
            assert_eq!(error.clone(), error);
        }
    }

    #[test]
    fn test_session_error_keeps_io_source() {
        let error = SessionError::Spawn {
            name: "camera-session-home-test".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads"),
        };
        assert!(error.to_string().contains("camera-session-home-test"));
        assert!(error.source().is_some());

        let invalid = SessionError::InvalidConfig("bad delay".to_string());
        assert!(invalid.source().is_none());
        assert!(invalid.to_string().contains("bad delay"));
    }

    #[test]
    fn test_fault_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder: Box<dyn FaultSink> = {
            let seen = seen.clone();
            Box::new(move |fault: Fault| seen.lock().unwrap().push(fault))
        };
        let fault = Fault::new("set_fps", CameraError::ControlError("30 fps".to_string()));

        recorder.report(fault.clone());
        LogFaults.report(fault.clone());

        assert_eq!(*seen.lock().unwrap(), vec![fault]);
    }
}
