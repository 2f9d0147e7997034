//! Alert sinks

use adas::Alert;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::TraceError;

/// Destination for alerts raised while processing a trace
pub trait AlertSink {
    fn write(&mut self, alert: &Alert) -> Result<(), TraceError>;

    fn flush(&mut self) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Alert CSV record: `timestamp,kind,subject,speed,distance,reason`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: f64,
    pub kind: String,
    pub subject: String,
    pub speed: f64,
    pub distance: Option<f64>,
    pub reason: String,
}

impl From<&Alert> for AlertRecord {
    fn from(alert: &Alert) -> Self {
        Self {
            timestamp: alert.time_s,
            kind: alert.kind.as_str().to_string(),
            subject: alert.subject.clone(),
            speed: alert.speed,
            distance: alert.distance,
            reason: alert.reason.clone(),
        }
    }
}

/// Appends alerts to a CSV stream, flushing after every row so the file is
/// complete even if the process is interrupted.
pub struct CsvAlertSink<W: Write> {
    writer: csv::Writer<W>,
    written: usize,
}

impl<W: Write> CsvAlertSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, TraceError> {
        self.writer
            .into_inner()
            .map_err(|e| TraceError::Io(e.into_error()))
    }
}

impl CsvAlertSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let path = path.as_ref();
        info!("Writing alerts to {}", path.display());
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> AlertSink for CsvAlertSink<W> {
    fn write(&mut self, alert: &Alert) -> Result<(), TraceError> {
        self.writer.serialize(AlertRecord::from(alert))?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Logs every alert as a warning
#[derive(Debug, Default)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn write(&mut self, alert: &Alert) -> Result<(), TraceError> {
        warn!(
            "[{}] {} t={:.2} speed={:.2} {}",
            alert.kind, alert.subject, alert.time_s, alert.speed, alert.reason
        );
        Ok(())
    }
}

/// Keeps alerts in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub alerts: Vec<Alert>,
}

impl AlertSink for VecSink {
    fn write(&mut self, alert: &Alert) -> Result<(), TraceError> {
        self.alerts.push(alert.clone());
        Ok(())
    }
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn write(&mut self, alert: &Alert) -> Result<(), TraceError> {
        (**self).write(alert)
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        (**self).flush()
    }
}
