use thiserror::Error;

/// Failures reported by the capture collaborators (device, ports, session, output).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Session configuration rejected: {0}")]
    TransactionRejected(String),
    #[error("Camera control error: {0}")]
    ControlError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Recording error: {0}")]
    RecordingError(String),
}

/// Errors surfaced while constructing a [`crate::CameraSession`].
///
/// Once a session exists no command returns an error; failures are absorbed
/// into state or routed to the installed [`FaultSink`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build home runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// A collaborator failure absorbed by the session context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub operation: &'static str,
    pub error: CameraError,
}

impl Fault {
    pub fn new(operation: &'static str, error: CameraError) -> Self {
        Self { operation, error }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

/// Receives every fault the session context absorbs.
///
/// Called on the home context only.
pub trait FaultSink: Send + 'static {
    fn report(&self, fault: Fault);
}

/// Default sink: log and move on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaults;

impl FaultSink for LogFaults {
    fn report(&self, fault: Fault) {
        log::warn!("{}", fault);
    }
}

impl<F> FaultSink for F
where
    F: Fn(Fault) + Send + 'static,
{
    fn report(&self, fault: Fault) {
        self(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_camera_error_display() {
        let err = CameraError::ControlError("zoom out of range".to_string());
        assert_eq!(err.to_string(), "Camera control error: zoom out of range");
    }

    #[test]
    fn test_fault_display_names_operation() {
        let fault = Fault::new("set_fps", CameraError::DeviceUnavailable("busy".into()));
        assert_eq!(fault.to_string(), "set_fps failed: Device unavailable: busy");
    }

    #[test]
    fn test_closure_fault_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |fault: Fault| seen.lock().unwrap().push(fault.operation)
        };
        sink.report(Fault::new("start", CameraError::CaptureError("x".into())));
        LogFaults.report(Fault::new("stop", CameraError::CaptureError("y".into())));
        assert_eq!(*seen.lock().unwrap(), vec!["start"]);
    }
}
