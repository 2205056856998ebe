use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::PathChild;

/// Write a blank image of the given size; the format follows the extension.
pub fn write_image(dir: &TempDir, name: &str, width: u32, height: u32) -> ChildPath {
    let path = dir.child(name);
    let format = image::ImageFormat::from_path(path.path()).unwrap();
    image::RgbImage::new(width, height)
        .save_with_format(path.path(), format)
        .unwrap();
    path
}

/// Write a landscape-pixel JPEG tagged with EXIF Orientation 6 (rotate 90),
/// the way phone cameras store portrait shots.
pub fn write_rotated_jpeg(dir: &TempDir, name: &str, width: u32, height: u32) -> ChildPath {
    let path = write_image(dir, name, width, height);
    let jpeg = std::fs::read(path.path()).unwrap();

    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&[0x00, 0x06, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    std::fs::write(path.path(), out).unwrap();
    path
}
