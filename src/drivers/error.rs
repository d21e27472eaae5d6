use thiserror::Error;
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("{0} must be at least 1 ms")]
    InvalidInterval(&'static str),
    #[error("no external device found")]
    DeviceNotFound,
    #[error("external device disconnected: {0}")]
    DeviceDisconnected(String),
    #[error("could not parse a sample from {line:?}")]
    SampleParse { line: String },
    #[error("invalid range: {0}")]
    InvalidRangeInput(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    #[error("invalid band configuration: {0}")]
    InvalidBands(String),
    #[error("video resource unavailable: {0}")]
    VideoUnavailable(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AcquisitionError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AcquisitionError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AcquisitionError {
    fn from(value: image::ImageError) -> Self {
        AcquisitionError::Plot(value.to_string())
    }
}
