//! Video validation
//!
//! Per file: extension, size and declared type, then a metadata probe for
//! duration and dimensions. A probe failure, or a duration that is not a
//! finite non-negative number, marks the file as corrupt.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use formcheck_core::{BaseValidator, ErrorStore, FormResult};
use serde::{Deserialize, Serialize};

use crate::file::{FileInput, FileOptions, FileRules, SizeUnit};
use crate::image::DimensionBounds;
use crate::MediaError;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const MAX_DEPTH: usize = 8;

/// What a probe learned about a video
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoMetadata {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Metadata extraction capability
#[async_trait]
pub trait VideoProbe: Send + Sync + Debug {
    async fn probe(&self, file: &FileInput) -> Result<VideoMetadata, MediaError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoOptions {
    #[serde(flatten)]
    pub file: FileOptions,
    #[serde(flatten)]
    pub dimensions: DimensionBounds,
    /// Seconds
    pub min_duration: Option<f64>,
    /// Seconds
    pub max_duration: Option<f64>,
}

impl VideoOptions {
    /// mp4, mov and webm up to 100 MB
    pub fn defaults() -> Self {
        Self {
            file: FileOptions {
                allowed_mime_types: ["video/mp4", "video/quicktime", "video/webm"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                max_size: Some(100.0),
                unit: SizeUnit::MB,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Reads MP4/MOV (ISO base media) files: `mvhd` for duration, `tkhd` for size
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoBmffProbe;

impl IsoBmffProbe {
    pub fn read(data: &[u8]) -> Result<VideoMetadata, MediaError> {
        if data.get(4..8) != Some(b"ftyp".as_slice()) {
            return Err(MediaError::Probe("not an ISO base media file".into()));
        }
        let mut movie = MovieBoxes::default();
        walk_boxes(data, 0, &mut movie)?;

        let (timescale, duration) = movie
            .header
            .ok_or_else(|| MediaError::Probe("missing movie header".into()))?;
        let (width, height) = movie.dimensions.unwrap_or_default();
        Ok(VideoMetadata {
            // A zero timescale yields NaN or infinity, which the validator rejects
            duration: duration as f64 / timescale as f64,
            width,
            height,
        })
    }
}

#[async_trait]
impl VideoProbe for IsoBmffProbe {
    async fn probe(&self, file: &FileInput) -> Result<VideoMetadata, MediaError> {
        Self::read(&file.read_all().await?)
    }
}

#[derive(Default)]
struct MovieBoxes {
    /// (timescale, duration)
    header: Option<(u32, u64)>,
    dimensions: Option<(u32, u32)>,
}

fn be_u32(data: &[u8], at: usize) -> Result<u32, MediaError> {
    data.get(at..at + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| MediaError::Probe("box truncated".into()))
}

fn be_u64(data: &[u8], at: usize) -> Result<u64, MediaError> {
    data.get(at..at + 8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| MediaError::Probe("box truncated".into()))
}

fn walk_boxes(data: &[u8], depth: usize, movie: &mut MovieBoxes) -> Result<(), MediaError> {
    if depth > MAX_DEPTH {
        return Err(MediaError::Probe("boxes nested too deeply".into()));
    }
    let mut pos = 0;
    while pos + 8 <= data.len() {
        let size = be_u32(data, pos)? as u64;
        let kind = &data[pos + 4..pos + 8];
        let (header, size) = match size {
            0 => (8, (data.len() - pos) as u64),
            1 => (16, be_u64(data, pos + 8)?),
            size => (8, size),
        };
        let end = usize::try_from(size)
            .ok()
            .and_then(|size| pos.checked_add(size))
            .filter(|end| size >= header as u64 && *end <= data.len())
            .ok_or_else(|| MediaError::Probe(format!("{} box overruns the file", String::from_utf8_lossy(kind))))?;
        let payload = &data[pos + header..end];

        match kind {
            b"moov" | b"trak" => walk_boxes(payload, depth + 1, movie)?,
            b"mvhd" => {
                movie.header = Some(match payload.first() {
                    Some(1) => (be_u32(payload, 20)?, be_u64(payload, 24)?),
                    _ => (be_u32(payload, 12)?, be_u32(payload, 16)? as u64),
                });
            }
            b"tkhd" if movie.dimensions.is_none() => {
                let offset = if payload.first() == Some(&1) { 88 } else { 76 };
                // 16.16 fixed point
                let width = be_u32(payload, offset)? >> 16;
                let height = be_u32(payload, offset + 4)? >> 16;
                if width > 0 && height > 0 {
                    movie.dimensions = Some((width, height));
                }
            }
            _ => {}
        }
        pos = end;
    }
    Ok(())
}

/// Reads WebM/Matroska files: segment info for duration, video track for size
#[derive(Debug, Clone, Copy, Default)]
pub struct MatroskaProbe;

const SEGMENT: u32 = 0x1853_8067;
const INFO: u32 = 0x1549_A966;
const TIMECODE_SCALE: u32 = 0x2A_D7B1;
const DURATION: u32 = 0x4489;
const TRACKS: u32 = 0x1654_AE6B;
const TRACK_ENTRY: u32 = 0xAE;
const VIDEO: u32 = 0xE0;
const PIXEL_WIDTH: u32 = 0xB0;
const PIXEL_HEIGHT: u32 = 0xBA;

#[derive(Default)]
struct SegmentInfo {
    timecode_scale: Option<u64>,
    duration: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

impl MatroskaProbe {
    pub fn read(data: &[u8]) -> Result<VideoMetadata, MediaError> {
        if !data.starts_with(&EBML_MAGIC) {
            return Err(MediaError::Probe("not an EBML file".into()));
        }
        let mut info = SegmentInfo::default();
        walk_elements(data, 0, &mut info)?;

        let ticks = info
            .duration
            .ok_or_else(|| MediaError::Probe("missing segment duration".into()))?;
        // Timecode scale is in nanoseconds per tick
        let scale = info.timecode_scale.unwrap_or(1_000_000) as f64;
        Ok(VideoMetadata {
            duration: ticks * scale / 1e9,
            width: info.width.unwrap_or_default(),
            height: info.height.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl VideoProbe for MatroskaProbe {
    async fn probe(&self, file: &FileInput) -> Result<VideoMetadata, MediaError> {
        Self::read(&file.read_all().await?)
    }
}

fn vint_length(first: u8, max: u32) -> Result<usize, MediaError> {
    let length = first.leading_zeros() + 1;
    if first == 0 || length > max {
        return Err(MediaError::Probe("malformed element header".into()));
    }
    Ok(length as usize)
}

/// Element id, marker bit kept
fn read_element_id(data: &[u8]) -> Result<(u32, usize), MediaError> {
    let first = *data.first().ok_or_else(|| MediaError::Probe("element truncated".into()))?;
    let length = vint_length(first, 4)?;
    let bytes = data
        .get(..length)
        .ok_or_else(|| MediaError::Probe("element truncated".into()))?;
    Ok((bytes.iter().fold(0, |id, byte| (id << 8) | *byte as u32), length))
}

/// Element size, `None` when unknown
fn read_element_size(data: &[u8]) -> Result<(Option<u64>, usize), MediaError> {
    let first = *data.first().ok_or_else(|| MediaError::Probe("element truncated".into()))?;
    let length = vint_length(first, 8)?;
    let bytes = data
        .get(..length)
        .ok_or_else(|| MediaError::Probe("element truncated".into()))?;
    let marker_mask = 0xFFu8.checked_shr(length as u32).unwrap_or(0);
    let value = bytes[1..]
        .iter()
        .fold((first & marker_mask) as u64, |value, byte| (value << 8) | *byte as u64);
    let unknown = (1u64 << (7 * length)) - 1;
    Ok(((value != unknown).then_some(value), length))
}

fn read_uint(data: &[u8]) -> u64 {
    data.iter().take(8).fold(0, |value, byte| (value << 8) | *byte as u64)
}

fn read_float(data: &[u8]) -> Result<f64, MediaError> {
    match data.len() {
        4 => Ok(f32::from_be_bytes([data[0], data[1], data[2], data[3]]) as f64),
        8 => Ok(f64::from_be_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        0 => Ok(0.0),
        _ => Err(MediaError::Probe("malformed float element".into())),
    }
}

fn walk_elements(data: &[u8], depth: usize, info: &mut SegmentInfo) -> Result<(), MediaError> {
    if depth > MAX_DEPTH {
        return Err(MediaError::Probe("elements nested too deeply".into()));
    }
    let mut pos = 0;
    while pos < data.len() {
        let (id, id_length) = read_element_id(&data[pos..])?;
        let (size, size_length) = read_element_size(&data[pos + id_length..])?;
        let start = pos + id_length + size_length;
        let end = match size {
            Some(size) => usize::try_from(size)
                .ok()
                .and_then(|size| start.checked_add(size))
                .filter(|end| *end <= data.len())
                .ok_or_else(|| MediaError::Probe("element overruns the file".into()))?,
            None => data.len(),
        };
        let body = &data[start..end];

        match id {
            SEGMENT | INFO | TRACKS | TRACK_ENTRY | VIDEO => walk_elements(body, depth + 1, info)?,
            TIMECODE_SCALE => info.timecode_scale = Some(read_uint(body)),
            DURATION => info.duration = Some(read_float(body)?),
            PIXEL_WIDTH if info.width.is_none() => info.width = Some(read_uint(body) as u32),
            PIXEL_HEIGHT if info.height.is_none() => info.height = Some(read_uint(body) as u32),
            _ => {}
        }
        pos = end;
    }
    Ok(())
}

/// Picks the ISO-BMFF or Matroska reader from the file's signature
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerProbe;

#[async_trait]
impl VideoProbe for ContainerProbe {
    async fn probe(&self, file: &FileInput) -> Result<VideoMetadata, MediaError> {
        let data = file.read_all().await?;
        if data.starts_with(&EBML_MAGIC) {
            MatroskaProbe::read(&data)
        } else {
            IsoBmffProbe::read(&data)
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoValidator {
    rules: FileRules,
    probe: Arc<dyn VideoProbe>,
}

impl VideoValidator {
    pub fn new(base: BaseValidator, probe: Arc<dyn VideoProbe>) -> Self {
        Self {
            rules: FileRules::new(base),
            probe,
        }
    }

    pub fn with_store(store: ErrorStore) -> Self {
        Self::new(BaseValidator::new(store), Arc::new(ContainerProbe))
    }

    pub fn base(&self) -> &BaseValidator {
        self.rules.base()
    }

    pub async fn validate(
        &self,
        files: &[FileInput],
        field: &str,
        options: &VideoOptions,
    ) -> FormResult<bool> {
        if self.rules.begin(files, field, &options.file) {
            for file in files {
                self.check_file(file, field, options).await;
            }
        }
        Ok(self.base().is_field_valid(field))
    }

    async fn check_file(&self, file: &FileInput, field: &str, options: &VideoOptions) -> bool {
        if !self.rules.check_extension(file, field, &options.file)
            || !self.rules.check_size(file, field, &options.file)
        {
            return false;
        }
        let declared = file.declared_mime();
        if !options.file.allows_mime(&declared) {
            return self.rules.fail(
                file,
                field,
                &format!("is a {declared} video, which is not allowed."),
            );
        }

        let metadata = match self.probe.probe(file).await {
            Ok(metadata) if metadata.duration.is_finite() && metadata.duration >= 0.0 => metadata,
            Ok(metadata) => {
                tracing::debug!(file = %file.name, duration = metadata.duration, "unusable duration");
                return self.rules.fail(file, field, "appears to be corrupt.");
            }
            Err(err) => {
                tracing::debug!(file = %file.name, error = %err, "video probe failed");
                return self.rules.fail(file, field, "appears to be corrupt.");
            }
        };

        let mut violations = if options.dimensions.is_unbounded() {
            Vec::new()
        } else {
            options.dimensions.violations(metadata.width, metadata.height)
        };
        if let Some(min) = options.min_duration.filter(|min| metadata.duration < *min) {
            violations.push(format!("must be at least {min} seconds long."));
        }
        if let Some(max) = options.max_duration.filter(|max| metadata.duration > *max) {
            violations.push(format!("must be at most {max} seconds long."));
        }
        for violation in &violations {
            self.rules.fail(file, field, violation);
        }
        violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut bytes = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(kind);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn mp4(timescale: u32, duration: u32, width: u32, height: u32) -> Vec<u8> {
        let mut mvhd = vec![0; 100];
        mvhd[12..16].copy_from_slice(&timescale.to_be_bytes());
        mvhd[16..20].copy_from_slice(&duration.to_be_bytes());
        let mut tkhd = vec![0; 84];
        tkhd[76..80].copy_from_slice(&(width << 16).to_be_bytes());
        tkhd[80..84].copy_from_slice(&(height << 16).to_be_bytes());

        let trak = mp4_box(b"trak", &mp4_box(b"tkhd", &tkhd));
        let mut moov = mp4_box(b"mvhd", &mvhd);
        moov.extend(trak);

        let mut file = mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2");
        file.extend(mp4_box(b"moov", &moov));
        file
    }

    fn element(id: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut bytes = id.to_vec();
        bytes.push(0x01);
        bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn webm(duration_ms: f64, width: u16, height: u8) -> Vec<u8> {
        let mut info = element(&[0x2A, 0xD7, 0xB1], &[0x0F, 0x42, 0x40]);
        info.extend(element(&[0x44, 0x89], &duration_ms.to_be_bytes()));
        let mut video = element(&[0xB0], &width.to_be_bytes());
        video.extend(element(&[0xBA], &[height]));
        let tracks = element(&[0x16, 0x54, 0xAE, 0x6B], &element(&[0xAE], &element(&[0xE0], &video)));

        let mut segment = element(&[0x15, 0x49, 0xA9, 0x66], &info);
        segment.extend(tracks);

        let mut file = element(&EBML_MAGIC, &[]);
        file.extend(element(&[0x18, 0x53, 0x80, 0x67], &segment));
        file
    }

    #[test]
    fn test_iso_bmff_probe() {
        let metadata = IsoBmffProbe::read(&mp4(1000, 5500, 640, 480)).unwrap();
        assert_eq!(metadata.duration, 5.5);
        assert_eq!((metadata.width, metadata.height), (640, 480));
        assert!(IsoBmffProbe::read(b"\0\0\0\x08moov").is_err());
    }

    #[test]
    fn test_matroska_probe() {
        let metadata = MatroskaProbe::read(&webm(12_000.0, 320, 240)).unwrap();
        assert_eq!(metadata.duration, 12.0);
        assert_eq!((metadata.width, metadata.height), (320, 240));
    }

    #[test]
    fn test_valid_video() {
        let v = VideoValidator::with_store(ErrorStore::new());
        let files = [
            FileInput::from_bytes("clip.mp4", "video/mp4", mp4(600, 1800, 1280, 720)),
            FileInput::from_bytes("clip.webm", "video/webm", webm(2_000.0, 320, 240)),
        ];
        assert!(smol::block_on(v.validate(&files, "clip", &VideoOptions::defaults())).unwrap());
    }

    #[test]
    fn test_corrupt_video() {
        let v = VideoValidator::with_store(ErrorStore::new());
        let files = [
            FileInput::from_bytes("broken.mp4", "video/mp4", b"\0\0\0\x18ftypisom".to_vec()),
            FileInput::from_bytes("zero.mp4", "video/mp4", mp4(0, 0, 640, 480)),
        ];
        assert!(!smol::block_on(v.validate(&files, "clip", &VideoOptions::defaults())).unwrap());
        assert_eq!(
            v.base().field_errors("clip"),
            vec!["broken.mp4 appears to be corrupt.", "zero.mp4 appears to be corrupt."]
        );
    }

    #[test]
    fn test_duration_and_dimension_bounds() {
        let v = VideoValidator::with_store(ErrorStore::new());
        let options = VideoOptions {
            dimensions: DimensionBounds {
                max_width: Some(1920),
                ..Default::default()
            },
            max_duration: Some(10.0),
            ..VideoOptions::defaults()
        };
        let files = [FileInput::from_bytes("long.mp4", "video/mp4", mp4(1, 30, 3840, 2160))];
        assert!(!smol::block_on(v.validate(&files, "clip", &options)).unwrap());
        assert_eq!(
            v.base().field_errors("clip"),
            vec![
                "long.mp4 must be at most 1920px wide.",
                "long.mp4 must be at most 10 seconds long.",
            ]
        );
    }

    #[test]
    fn test_declared_type_must_be_allowed() {
        let v = VideoValidator::with_store(ErrorStore::new());
        let options = VideoOptions {
            file: FileOptions {
                extensions: Some(vec!["avi".into()]),
                ..VideoOptions::defaults().file
            },
            ..VideoOptions::defaults()
        };
        let files = [FileInput::from_bytes("old.avi", "video/x-msvideo", vec![0; 16])];
        assert!(!smol::block_on(v.validate(&files, "clip", &options)).unwrap());
        assert_eq!(
            v.base().field_errors("clip"),
            vec!["old.avi is a video/x-msvideo video, which is not allowed."]
        );
    }
}
