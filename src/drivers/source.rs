use std::f32::consts::PI;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use log::{debug, info, warn};
use rand::Rng;
use serialport::SerialPort;
use crate::config::SerialSettings;
use crate::drivers::AcquisitionError;
/// Something that yields one scalar sample per poll.
///
/// `Ok(None)` marks the end of a finite stream. An error is terminal: the
/// caller stops polling and tears the session down.
pub trait SampleSource: Send {
    fn next_sample(&mut self) -> Result<Option<f32>, AcquisitionError>;
    fn close(&mut self) {}
    fn describe(&self) -> String;
}
/// Opens hardware-backed sources.
pub trait DeviceConnector: Send {
    fn connect(&self, port: Option<&str>) -> Result<Box<dyn SampleSource>, AcquisitionError>;
}
/// Parses one device line. An empty line is a defined zero sample.
pub fn parse_sample_line(line: &str) -> Result<f32, AcquisitionError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AcquisitionError::SampleParse {
            line: trimmed.to_owned(),
        })
}
/// Line-oriented ASCII device, normally a serial port.
pub struct SerialSource<R = BufReader<Box<dyn SerialPort>>> {
    port_name: String,
    reader: Option<R>,
    pending: Vec<u8>,
    awaiting_preamble: bool,
}
impl SerialSource {
    pub fn open(settings: &SerialSettings, port: Option<&str>) -> Result<Self, AcquisitionError> {
        let port_name = match port.or(settings.port.as_deref()) {
            Some(name) => name.to_owned(),
            None => first_available_port()?,
        };
        let serial = serialport::new(&port_name, settings.baud_rate)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()
            .map_err(|err| {
                warn!("could not open {port_name}: {err}");
                AcquisitionError::DeviceNotFound
            })?;
        info!("opened serial device {port_name} at {} baud", settings.baud_rate);
        Ok(Self::from_reader(port_name, BufReader::new(serial)))
    }
}
impl<R> SerialSource<R> {
    fn release(&mut self) {
        if self.reader.take().is_some() {
            info!("closed serial device {}", self.port_name);
        }
    }
}
impl<R: BufRead> SerialSource<R> {
    /// The device always opens with a preamble line that carries no data;
    /// the first complete line read is dropped.
    pub fn from_reader(port_name: impl Into<String>, reader: R) -> Self {
        Self {
            port_name: port_name.into(),
            reader: Some(reader),
            pending: Vec::new(),
            awaiting_preamble: true,
        }
    }
    /// Reads one complete line. `None` means the read timed out; partial
    /// bytes stay buffered for the next call.
    fn read_line(&mut self) -> Result<Option<String>, AcquisitionError> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            AcquisitionError::DeviceDisconnected(format!("{} is closed", self.port_name))
        })?;
        match reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => Err(AcquisitionError::DeviceDisconnected(format!(
                "{} reached end of stream",
                self.port_name
            ))),
            Ok(_) if self.pending.last() == Some(&b'\n') => {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                Ok(Some(line))
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(AcquisitionError::DeviceDisconnected(format!(
                "{}: {err}",
                self.port_name
            ))),
        }
    }
}
impl<R: BufRead + Send> SampleSource for SerialSource<R> {
    fn next_sample(&mut self) -> Result<Option<f32>, AcquisitionError> {
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                // A timeout reads as an empty line.
                Ok(None) => return Ok(Some(0.0)),
                Err(err) => {
                    self.release();
                    return Err(err);
                }
            };
            if self.awaiting_preamble {
                self.awaiting_preamble = false;
                debug!("discarded device preamble {line:?}");
                continue;
            }
            return match parse_sample_line(&line) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    debug!("{err}; substituting 0");
                    Ok(Some(0.0))
                }
            };
        }
    }
    fn close(&mut self) {
        self.release();
    }
    fn describe(&self) -> String {
        format!("serial device {}", self.port_name)
    }
}
impl<R> Drop for SerialSource<R> {
    fn drop(&mut self) {
        self.release();
    }
}
/// Names of the serial ports the OS currently reports.
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
fn first_available_port() -> Result<String, AcquisitionError> {
    available_ports()
        .into_iter()
        .next()
        .ok_or(AcquisitionError::DeviceNotFound)
}
pub struct SerialConnector {
    settings: SerialSettings,
}
impl SerialConnector {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}
impl DeviceConnector for SerialConnector {
    fn connect(&self, port: Option<&str>) -> Result<Box<dyn SampleSource>, AcquisitionError> {
        Ok(Box::new(SerialSource::open(&self.settings, port)?))
    }
}
/// Replays a loaded, finite sequence in order.
pub struct ReplaySource {
    samples: Vec<f32>,
    cursor: usize,
}
impl ReplaySource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples, cursor: 0 }
    }
}
impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> Result<Option<f32>, AcquisitionError> {
        let sample = self.samples.get(self.cursor).copied();
        if sample.is_some() {
            self.cursor += 1;
        }
        Ok(sample)
    }
    fn describe(&self) -> String {
        format!("replay of {} samples", self.samples.len())
    }
}
/// Synthetic sine plus noise, for running without a device.
pub struct SimulatedSource {
    frequency_hz: f32,
    sample_rate_hz: f32,
    amplitude: f32,
    noise: f32,
    index: u64,
}
impl SimulatedSource {
    pub fn new(frequency_hz: f32, sample_rate_hz: f32) -> Self {
        Self {
            frequency_hz,
            sample_rate_hz,
            amplitude: 100.0,
            noise: 10.0,
            index: 0,
        }
    }
}
impl SampleSource for SimulatedSource {
    fn next_sample(&mut self) -> Result<Option<f32>, AcquisitionError> {
        let t = self.index as f32 / self.sample_rate_hz;
        self.index += 1;
        let jitter = rand::thread_rng().gen_range(-self.noise..=self.noise);
        Ok(Some(512.0 + self.amplitude * (2.0 * PI * self.frequency_hz * t).sin() + jitter))
    }
    fn describe(&self) -> String {
        format!("simulated {:.1} Hz signal", self.frequency_hz)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Read;
    /// Serves one scripted chunk or error per `read` call, then EOF.
    struct ScriptedPort {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }
    impl ScriptedPort {
        fn new(steps: Vec<io::Result<&str>>) -> BufReader<Self> {
            let steps = steps
                .into_iter()
                .map(|step| step.map(|text| text.as_bytes().to_vec()))
                .collect();
            BufReader::new(Self { steps })
        }
    }
    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }
    fn timeout() -> io::Result<&'static str> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
    }
    #[test]
    fn serial_lines_map_to_samples() {
        let port = ScriptedPort::new(vec![
            Ok("ARDUINO READY\r\n"),
            Ok("512\r\n"),
            Ok("\n"),
            timeout(),
            Ok("12"),
            timeout(),
            Ok("3\n"),
            Ok("x?\n"),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
        ]);
        let mut source = SerialSource::from_reader("COM7", port);
        assert_eq!(source.next_sample().unwrap(), Some(512.0));
        assert_eq!(source.next_sample().unwrap(), Some(0.0));
        assert_eq!(source.next_sample().unwrap(), Some(0.0));
        // Partial line, then timeout: the bytes wait for the rest.
        assert_eq!(source.next_sample().unwrap(), Some(0.0));
        assert_eq!(source.next_sample().unwrap(), Some(123.0));
        assert_eq!(source.next_sample().unwrap(), Some(0.0));
        assert!(matches!(
            source.next_sample(),
            Err(AcquisitionError::DeviceDisconnected(_))
        ));
        assert!(source.reader.is_none());
        assert!(matches!(
            source.next_sample(),
            Err(AcquisitionError::DeviceDisconnected(_))
        ));
    }
    #[test]
    fn timeout_before_preamble_still_drops_it() {
        let port = ScriptedPort::new(vec![timeout(), Ok("boot\n"), Ok("7\n")]);
        let mut source = SerialSource::from_reader("COM7", port);
        assert_eq!(source.next_sample().unwrap(), Some(0.0));
        assert_eq!(source.next_sample().unwrap(), Some(7.0));
    }
    #[test]
    fn end_of_stream_is_a_disconnect() {
        let port = ScriptedPort::new(vec![Ok("boot\n"), Ok("1\n")]);
        let mut source = SerialSource::from_reader("COM7", port);
        assert_eq!(source.next_sample().unwrap(), Some(1.0));
        assert!(matches!(
            source.next_sample(),
            Err(AcquisitionError::DeviceDisconnected(_))
        ));
        assert!(source.reader.is_none());
    }
    #[test]
    fn empty_line_is_zero() {
        assert_eq!(parse_sample_line("").unwrap(), 0.0);
        assert_eq!(parse_sample_line("\r\n").unwrap(), 0.0);
    }
    #[test]
    fn parses_numbers_and_flags_garbage() {
        assert_eq!(parse_sample_line("512\r\n").unwrap(), 512.0);
        assert_eq!(parse_sample_line(" -3.25 ").unwrap(), -3.25);
        assert!(matches!(
            parse_sample_line("\u{fffd}x1"),
            Err(AcquisitionError::SampleParse { .. })
        ));
        assert!(parse_sample_line("NaN").is_err());
    }
    #[test]
    fn replay_ends_after_last_sample() {
        let mut source = ReplaySource::new(vec![1.0, 2.0]);
        assert_eq!(source.next_sample().unwrap(), Some(1.0));
        assert_eq!(source.next_sample().unwrap(), Some(2.0));
        assert_eq!(source.next_sample().unwrap(), None);
        assert_eq!(source.next_sample().unwrap(), None);
    }
    #[test]
    fn simulated_source_oscillates_around_midpoint() {
        let mut source = SimulatedSource::new(10.0, 50.0);
        let samples: Vec<f32> = (0..50).map(|_| source.next_sample().unwrap().unwrap()).collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!((mean - 512.0).abs() < 15.0);
        assert!(samples.iter().any(|v| *v > 580.0));
    }
}
