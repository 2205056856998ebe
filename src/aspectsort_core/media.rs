use crate::aspectsort_core::error::ProbeError;
use image::metadata::Orientation as ExifOrientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Image file extensions (lowercase).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Video file extensions (lowercase).
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Map a lowercase extension to the kind of media it holds.
    pub fn from_extension(ext: &str) -> Option<MediaKind> {
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub path: PathBuf,
    /// Lowercased extension, empty when the file has none.
    pub extension: String,
}

impl MediaEntry {
    pub fn new(path: PathBuf) -> Self {
        let extension = path
            .extension()
            .unwrap_or_default()
            .to_string_lossy()
            .to_lowercase();
        MediaEntry { path, extension }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_extension(&self.extension)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// Pixel dimensions of an image or video frame. Both axes are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, ProbeError> {
        if width == 0 || height == 0 {
            return Err(ProbeError::ZeroDimensions { width, height });
        }
        Ok(Dimensions { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// The same size turned a quarter turn.
    pub fn transposed(self) -> Self {
        Dimensions {
            width: self.height,
            height: self.width,
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.aspect_ratio() < 1.0 {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Square media counts as landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    pub fn folder_name(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of probing one file.
#[derive(Debug)]
pub enum Probe {
    Dimensions(Dimensions),
    Unsupported,
    Unreadable(ProbeError),
}

impl From<Result<Dimensions, ProbeError>> for Probe {
    fn from(result: Result<Dimensions, ProbeError>) -> Self {
        match result {
            Ok(dims) => Probe::Dimensions(dims),
            Err(e) => Probe::Unreadable(e),
        }
    }
}

/// Reads pixel dimensions from a media file. Implementations must never
/// modify the file.
pub trait MediaProber {
    fn probe(&self, path: &Path) -> Probe;
}

/// Prober backed by the `image` crate for stills and `ffprobe` for videos.
#[derive(Debug, Clone)]
pub struct FileProber {
    ffprobe: PathBuf,
}

impl Default for FileProber {
    fn default() -> Self {
        FileProber {
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FileProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffprobe binary instead of the one on PATH.
    pub fn with_ffprobe(ffprobe: impl Into<PathBuf>) -> Self {
        FileProber {
            ffprobe: ffprobe.into(),
        }
    }
}

impl MediaProber for FileProber {
    fn probe(&self, path: &Path) -> Probe {
        let entry = MediaEntry::new(path.to_path_buf());
        let result = match entry.kind() {
            Some(MediaKind::Image) => image_dimensions(path),
            Some(MediaKind::Video) => video_dimensions(&self.ffprobe, path),
            None => return Probe::Unsupported,
        };
        match &result {
            Ok(dims) => log::debug!("Probed {} as {}", path.display(), dims),
            Err(e) => log::debug!("Could not probe {}: {}", path.display(), e),
        }
        result.into()
    }
}

/// Displayed size of a still image, after its EXIF orientation is applied.
///
/// The whole image is decoded, without the default allocation cap, so that
/// truncated files are rejected and very large photos are not.
pub fn image_dimensions(path: &Path) -> Result<Dimensions, ProbeError> {
    let mut reader = ImageReader::open(path)
        .map_err(ProbeError::Open)?
        .with_guessed_format()
        .map_err(ProbeError::Open)?;
    reader.no_limits();

    let mut decoder = reader.into_decoder()?;
    let exif_orientation = decoder.orientation().unwrap_or_else(|e| {
        log::debug!("Ignoring unreadable orientation in {}: {}", path.display(), e);
        ExifOrientation::NoTransforms
    });
    let (width, height) = decoder.dimensions();
    DynamicImage::from_decoder(decoder)?;

    let dims = Dimensions::new(width, height)?;
    let quarter_turn = matches!(
        exif_orientation,
        ExifOrientation::Rotate90
            | ExifOrientation::Rotate270
            | ExifOrientation::Rotate90FlipH
            | ExifOrientation::Rotate270FlipH
    );
    Ok(if quarter_turn { dims.transposed() } else { dims })
}

#[derive(Deserialize, Debug, Default)]
struct FfprobeOutput {
    #[serde(default)]
    frames: Vec<FfprobeFrame>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize, Debug)]
struct FfprobeFrame {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
struct FfprobeStream {
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Deserialize, Debug, Default)]
struct FfprobeSideData {
    #[serde(default)]
    rotation: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
struct FfprobeTags {
    #[serde(default)]
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees. The display matrix wins over the legacy tag.
    fn rotation(&self) -> Option<f64> {
        self.side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .or_else(|| self.tags.rotate.as_deref()?.trim().parse().ok())
    }
}

/// Displayed size of the first decoded frame of the first video stream.
///
/// The frame is decoded rather than trusting the stream header, since some
/// containers declare dimensions that differ from what the codec produces.
/// A rotation of 90 or 270 degrees swaps width and height.
pub fn video_dimensions(ffprobe: &Path, path: &Path) -> Result<Dimensions, ProbeError> {
    let output = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-read_intervals", "%+#1",
            "-show_entries", "frame=width,height:stream_side_data=rotation:stream_tags=rotate",
            "-of", "json",
        ])
        .arg(path)
        .output()
        .map_err(ProbeError::FfprobeUnavailable)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Ffprobe(stderr.trim().to_string()));
    }

    parse_ffprobe_output(&output.stdout)
}

fn parse_ffprobe_output(stdout: &[u8]) -> Result<Dimensions, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)?;
    let frame = parsed
        .frames
        .iter()
        .find(|f| f.width.is_some() && f.height.is_some())
        .ok_or(ProbeError::NoFrame)?;
    let dims = Dimensions::new(frame.width.unwrap_or(0), frame.height.unwrap_or(0))?;

    let rotation = parsed.streams.first().and_then(FfprobeStream::rotation);
    let quarter_turn = rotation.is_some_and(|deg| (deg.round() as i64).rem_euclid(180) == 90);
    Ok(if quarter_turn { dims.transposed() } else { dims })
}

/// Check if ffprobe is available on the system.
pub fn ffprobe_available() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaEntry::new("photo.jpg".into()).kind(), Some(MediaKind::Image));
        assert_eq!(MediaEntry::new("photo.JPEG".into()).kind(), Some(MediaKind::Image));
        assert_eq!(MediaEntry::new("photo.Png".into()).kind(), Some(MediaKind::Image));
        assert_eq!(MediaEntry::new("clip.MP4".into()).kind(), Some(MediaKind::Video));
        assert_eq!(MediaEntry::new("clip.mov".into()).kind(), Some(MediaKind::Video));
        assert_eq!(MediaEntry::new("notes.txt".into()).kind(), None);
        assert_eq!(MediaEntry::new("photo.heic".into()).kind(), None);
        assert_eq!(MediaEntry::new("README".into()).kind(), None);
    }

    #[test]
    fn test_entry_extension_is_lowercase() {
        let entry = MediaEntry::new("dir/IMG_0001.JPG".into());
        assert_eq!(entry.extension, "jpg");
        assert_eq!(entry.file_name(), "IMG_0001.JPG");
    }

    #[test]
    fn test_orientation_rule() {
        assert_eq!(Dimensions::new(600, 800).unwrap().orientation(), Orientation::Portrait);
        assert_eq!(Dimensions::new(800, 600).unwrap().orientation(), Orientation::Landscape);
        assert_eq!(Dimensions::new(500, 500).unwrap().orientation(), Orientation::Landscape);
        assert_eq!(Dimensions::new(1079, 1080).unwrap().orientation(), Orientation::Portrait);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            Dimensions::new(0, 10),
            Err(ProbeError::ZeroDimensions { width: 0, height: 10 })
        ));
        assert!(Dimensions::new(10, 0).is_err());
    }

    #[test]
    fn test_orientation_folder_names() {
        assert_eq!(Orientation::Portrait.folder_name(), "portrait");
        assert_eq!(Orientation::Landscape.folder_name(), "landscape");
        assert_eq!(Dimensions::new(1920, 1080).unwrap().to_string(), "1920x1080");
    }

    #[test]
    fn test_probe_images() {
        let temp = assert_fs::TempDir::new().unwrap();
        let png = temp.child("tall.png");
        image::RgbImage::new(30, 40).save(png.path()).unwrap();
        let jpg = temp.child("wide.JPG");
        image::RgbImage::new(40, 30)
            .save_with_format(jpg.path(), image::ImageFormat::Jpeg)
            .unwrap();

        let prober = FileProber::new();
        match prober.probe(png.path()) {
            Probe::Dimensions(d) => assert_eq!((d.width(), d.height()), (30, 40)),
            other => panic!("unexpected probe result: {:?}", other),
        }
        match prober.probe(jpg.path()) {
            Probe::Dimensions(d) => assert_eq!(d.orientation(), Orientation::Landscape),
            other => panic!("unexpected probe result: {:?}", other),
        }
    }

    /// Write a JPEG whose pixels are `width`x`height` and whose EXIF
    /// Orientation tag is `orientation`.
    fn write_exif_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
        image::RgbImage::new(width, height)
            .save_with_format(path, image::ImageFormat::Jpeg)
            .unwrap();
        let jpeg = std::fs::read(path).unwrap();

        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        app1.extend_from_slice(&orientation.to_be_bytes());
        app1.extend_from_slice(&[0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn test_probe_applies_exif_rotation() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rotated = temp.child("phone.jpg");
        write_exif_jpeg(rotated.path(), 40, 30, 6);
        let upside_down = temp.child("flipped.jpg");
        write_exif_jpeg(upside_down.path(), 40, 30, 3);

        let prober = FileProber::new();
        match prober.probe(rotated.path()) {
            Probe::Dimensions(d) => {
                assert_eq!((d.width(), d.height()), (30, 40));
                assert_eq!(d.orientation(), Orientation::Portrait);
            }
            other => panic!("unexpected probe result: {:?}", other),
        }
        match prober.probe(upside_down.path()) {
            Probe::Dimensions(d) => assert_eq!(d.orientation(), Orientation::Landscape),
            other => panic!("unexpected probe result: {:?}", other),
        }
    }

    #[test]
    fn test_probe_image_above_default_memory_limit() {
        // 16000x12000 RGB decodes to ~576 MB, over the image crate's 512 MiB default.
        let temp = assert_fs::TempDir::new().unwrap();
        let big = temp.child("big.png");
        image::RgbImage::new(16000, 12000).save(big.path()).unwrap();

        match FileProber::new().probe(big.path()) {
            Probe::Dimensions(d) => assert_eq!((d.width(), d.height()), (16000, 12000)),
            other => panic!("unexpected probe result: {:?}", other),
        }
    }

    #[test]
    fn test_probe_corrupt_image_is_unreadable() {
        let temp = assert_fs::TempDir::new().unwrap();
        let bad = temp.child("broken.jpg");
        bad.write_str("definitely not a jpeg").unwrap();

        let prober = FileProber::new();
        assert!(matches!(prober.probe(bad.path()), Probe::Unreadable(_)));
        bad.assert("definitely not a jpeg");
    }

    #[test]
    fn test_probe_unsupported_does_not_open() {
        // The file does not exist; an unsupported extension must short-circuit.
        let prober = FileProber::new();
        assert!(matches!(prober.probe(Path::new("/nonexistent/notes.txt")), Probe::Unsupported));
    }

    #[test]
    fn test_probe_video_without_ffprobe() {
        let temp = assert_fs::TempDir::new().unwrap();
        let clip = temp.child("clip.mp4");
        clip.write_binary(&[0u8; 16]).unwrap();

        let prober = FileProber::with_ffprobe(temp.path().join("no-such-ffprobe"));
        assert!(matches!(
            prober.probe(clip.path()),
            Probe::Unreadable(ProbeError::FfprobeUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_ffprobe_output() {
        let json = br#"{"frames": [{"width": 1080, "height": 1920}]}"#;
        let dims = parse_ffprobe_output(json).unwrap();
        assert_eq!(dims.orientation(), Orientation::Portrait);

        let empty = br#"{"frames": []}"#;
        assert!(matches!(parse_ffprobe_output(empty), Err(ProbeError::NoFrame)));

        let missing = br#"{}"#;
        assert!(matches!(parse_ffprobe_output(missing), Err(ProbeError::NoFrame)));

        let zero = br#"{"frames": [{"width": 0, "height": 720}]}"#;
        assert!(matches!(
            parse_ffprobe_output(zero),
            Err(ProbeError::ZeroDimensions { .. })
        ));
    }

    #[test]
    fn test_parse_ffprobe_rotation() {
        let side_data = br#"{
            "frames": [{"width": 1920, "height": 1080}],
            "streams": [{"side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}]
        }"#;
        let dims = parse_ffprobe_output(side_data).unwrap();
        assert_eq!((dims.width(), dims.height()), (1080, 1920));
        assert_eq!(dims.orientation(), Orientation::Portrait);

        let legacy_tag = br#"{
            "frames": [{"width": 1920, "height": 1080}],
            "streams": [{"tags": {"rotate": "270"}}]
        }"#;
        assert_eq!(parse_ffprobe_output(legacy_tag).unwrap().orientation(), Orientation::Portrait);

        let half_turn = br#"{
            "frames": [{"width": 1920, "height": 1080}],
            "streams": [{"side_data_list": [{"rotation": 180}]}]
        }"#;
        assert_eq!(parse_ffprobe_output(half_turn).unwrap().orientation(), Orientation::Landscape);

        let unrotated = br#"{
            "frames": [{"width": 1920, "height": 1080}],
            "streams": [{}]
        }"#;
        assert_eq!(parse_ffprobe_output(unrotated).unwrap().orientation(), Orientation::Landscape);
    }
}
