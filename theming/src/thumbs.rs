use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use image::imageops::FilterType;

/// Longest edge of a cached picker thumbnail.
pub const MAX_DIMENSION: u32 = 500;

/// Thumbnail generation is CPU-bound image resizing; a small fixed
/// pool keeps the picker snappy on large wallpaper sets.
const POOL_SIZE: usize = 4;

/// Cache location for a source image, addressed by file stem.
pub fn thumbnail_path(cache_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    cache_dir.join(format!("{stem}.png"))
}

/// Generate every missing thumbnail in `jobs` (`(source, thumbnail)`
/// pairs) on a pool of [`POOL_SIZE`] worker threads. Each worker writes
/// a distinct output file; failures are logged per job and never abort
/// the batch.
pub fn generate_missing(jobs: Vec<(PathBuf, PathBuf)>) {
    if jobs.is_empty() {
        return;
    }
    let queue = Mutex::new(jobs.into_iter());
    thread::scope(|scope| {
        for _ in 0..POOL_SIZE {
            scope.spawn(|| {
                loop {
                    let job = queue.lock().ok().and_then(|mut pending| pending.next());
                    let Some((source, thumbnail)) = job else {
                        break;
                    };
                    if let Err(e) = create_thumbnail(&source, &thumbnail) {
                        log::warn!(
                            "Failed to build a thumbnail for '{}': {e}",
                            source.display()
                        );
                    }
                }
            });
        }
    });
}

/// Build one thumbnail: images already within bounds are copied
/// as-is, larger ones are scaled so the short side hits
/// [`MAX_DIMENSION`] and then center-cropped square. An existing
/// thumbnail is reused untouched.
pub fn create_thumbnail(source: &Path, thumbnail: &Path) -> image::ImageResult<()> {
    if thumbnail.exists() {
        return Ok(());
    }

    let img = image::open(source)?;
    let (width, height) = (img.width(), img.height());

    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return img.save(thumbnail);
    }

    let max = u64::from(MAX_DIMENSION);
    let (new_width, new_height) = if width > height {
        ((u64::from(width) * max / u64::from(height)) as u32, MAX_DIMENSION)
    } else {
        (MAX_DIMENSION, (u64::from(height) * max / u64::from(width)) as u32)
    };

    let resized = img.resize_exact(new_width, new_height, FilterType::Triangle);
    let cropped = resized.crop_imm(
        (new_width - MAX_DIMENSION) / 2,
        (new_height - MAX_DIMENSION) / 2,
        MAX_DIMENSION,
        MAX_DIMENSION,
    );
    cropped.save(thumbnail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    fn write_image(path: &Path, width: u32, height: u32) {
        RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn thumbnail_path_uses_source_stem() {
        assert_eq!(
            thumbnail_path(Path::new("/cache"), Path::new("/walls/forest.jpg")),
            PathBuf::from("/cache/forest.png")
        );
    }

    #[test]
    fn small_images_are_kept_as_is() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("small.png");
        let thumb = tmp.path().join("small-thumb.png");
        write_image(&source, 120, 80);

        create_thumbnail(&source, &thumb).unwrap();
        let out = image::open(&thumb).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
    }

    #[test]
    fn large_images_are_cropped_square() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("large.png");
        let thumb = tmp.path().join("large-thumb.png");
        write_image(&source, 1920, 1080);

        create_thumbnail(&source, &thumb).unwrap();
        let out = image::open(&thumb).unwrap();
        assert_eq!((out.width(), out.height()), (MAX_DIMENSION, MAX_DIMENSION));
    }

    #[test]
    fn existing_thumbnails_are_not_regenerated() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("wall.png");
        let thumb = tmp.path().join("wall-thumb.png");
        write_image(&source, 800, 600);
        std::fs::write(&thumb, b"sentinel").unwrap();

        create_thumbnail(&source, &thumb).unwrap();
        assert_eq!(std::fs::read(&thumb).unwrap(), b"sentinel");
    }

    #[test]
    fn generate_missing_builds_every_thumbnail() {
        let tmp = TempDir::new().unwrap();
        let sources = tmp.path().join("walls");
        let cache = tmp.path().join("cache");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::create_dir_all(&cache).unwrap();

        let mut jobs = Vec::new();
        for i in 0..10 {
            let source = sources.join(format!("wall{i}.png"));
            write_image(&source, 640, 640);
            jobs.push((source.clone(), thumbnail_path(&cache, &source)));
        }
        generate_missing(jobs.clone());
        for (_, thumb) in jobs {
            assert!(thumb.is_file());
            let out = image::open(&thumb).unwrap();
            assert_eq!((out.width(), out.height()), (MAX_DIMENSION, MAX_DIMENSION));
        }
    }
}
