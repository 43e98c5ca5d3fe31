// Image collection module
// Owns every loaded image, the current-image cursor and the fit/center geometry

use crate::canvas::Texture;
use crate::error::{LoadError, ScanError};
use crate::geometry::{Rect, Viewport};
use crate::image_loader::{Decoded, ImageSource};
use log::{debug, info, warn};
use std::borrow::Borrow;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions picked up when scanning a folder (matched case-sensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Smallest zoom `fit_to_window` will produce
pub const MIN_VIEW_SCALE: f32 = 0.1;

/// One decoded image resource, exclusively owned by the collection
#[derive(Debug)]
pub struct LoadedImage<H> {
    handle: H,
    width: u32,
    height: u32,
    source_path: PathBuf,
}

impl<H: Borrow<Texture>> LoadedImage<H> {
    pub fn texture(&self) -> &Texture {
        self.handle.borrow()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

/// Zoom and placement of the current image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

/// Outcome of a folder open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FolderSummary {
    pub loaded: usize,
    pub skipped: usize,
}

pub struct ImageCollection<S: ImageSource> {
    source: S,
    items: Vec<LoadedImage<S::Handle>>,
    current: Option<usize>,
    view: ViewTransform,
}

impl<S: ImageSource> ImageCollection<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            items: Vec::new(),
            current: None,
            view: ViewTransform::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the current image, `None` when the collection is empty
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&LoadedImage<S::Handle>> {
        self.current.and_then(|idx| self.items.get(idx))
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Decode `path` and append it; the cursor is left alone
    pub fn load_image(&mut self, path: &Path) -> Result<(), LoadError> {
        let Decoded {
            handle,
            width,
            height,
        } = self.source.load(path)?;

        info!("Image loaded: {} ({}x{})", path.display(), width, height);
        self.items.push(LoadedImage {
            handle,
            width,
            height,
            source_path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Replace the collection with a single image
    ///
    /// On failure the collection is left empty.
    pub fn open_single(&mut self, path: &Path, viewport: Viewport) -> Result<(), LoadError> {
        self.clear_all();
        self.load_image(path)?;
        self.current = Some(0);
        self.refit(viewport);
        Ok(())
    }

    /// Replace the collection with every recognised image directly inside `path`
    ///
    /// Entries are loaded in directory enumeration order. Entries that fail to
    /// decode are skipped.
    pub fn open_folder(
        &mut self,
        path: &Path,
        viewport: Viewport,
    ) -> Result<FolderSummary, ScanError> {
        self.clear_all();

        let entries = fs::read_dir(path).map_err(|source| ScanError::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;

        let mut summary = FolderSummary::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                    continue;
                }
            };

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let entry_path = entry.path();
            if !is_file || !has_image_extension(&entry_path) {
                continue;
            }

            match self.load_image(&entry_path) {
                Ok(()) => summary.loaded += 1,
                Err(e) => {
                    debug!("Skipping {}: {}", entry_path.display(), e);
                    summary.skipped += 1;
                }
            }
        }

        if self.items.is_empty() {
            self.current = None;
        } else {
            self.current = Some(0);
            self.refit(viewport);
        }

        info!(
            "Folder {}: {} image(s) loaded, {} skipped",
            path.display(),
            summary.loaded,
            summary.skipped
        );
        Ok(summary)
    }

    /// Advance to the next image; no-op at the last index
    pub fn next(&mut self, viewport: Viewport) -> bool {
        match self.current {
            Some(idx) if self.items.len() > 1 && idx + 1 < self.items.len() => {
                self.current = Some(idx + 1);
                self.refit(viewport);
                true
            }
            _ => false,
        }
    }

    /// Step back to the previous image; no-op at index 0
    pub fn previous(&mut self, viewport: Viewport) -> bool {
        match self.current {
            Some(idx) if self.items.len() > 1 && idx > 0 => {
                self.current = Some(idx - 1);
                self.refit(viewport);
                true
            }
            _ => false,
        }
    }

    /// Fit then center the current image
    pub fn refit(&mut self, viewport: Viewport) {
        self.fit_to_window(viewport.available_width(), viewport.available_height());
        self.center(viewport.width as i32, viewport.height as i32, viewport.top_inset as i32);
    }

    /// Largest uniform scale at which the current image fits the available area,
    /// never below `MIN_VIEW_SCALE`
    pub fn fit_to_window(&mut self, available_width: i32, available_height: i32) {
        let Some(image) = self.current() else {
            return;
        };
        let scale_x = available_width as f32 / image.width as f32;
        let scale_y = available_height as f32 / image.height as f32;
        self.view.scale = scale_x.min(scale_y).max(MIN_VIEW_SCALE);
        debug!("Image scale set to: {}", self.view.scale);
    }

    /// Center the scaled current image in the area below `top_inset`
    pub fn center(&mut self, window_width: i32, window_height: i32, top_inset: i32) {
        let Some((scaled_width, scaled_height)) = self.scaled_size() else {
            return;
        };
        self.view.offset_x = (window_width - scaled_width) / 2;
        self.view.offset_y = top_inset + (window_height - top_inset - scaled_height) / 2;
        debug!(
            "Image centered at: {}, {}",
            self.view.offset_x, self.view.offset_y
        );
    }

    /// Current image dimensions after applying the view scale
    pub fn scaled_size(&self) -> Option<(i32, i32)> {
        let image = self.current()?;
        Some((
            (image.width as f32 * self.view.scale) as i32,
            (image.height as f32 * self.view.scale) as i32,
        ))
    }

    /// Where the current image lands in the window
    pub fn dest_rect(&self) -> Option<Rect> {
        let (w, h) = self.scaled_size()?;
        Some(Rect::new(self.view.offset_x, self.view.offset_y, w, h))
    }

    /// Drop the current image and keep the cursor in range
    ///
    /// The view transform goes back to defaults even when other images remain.
    pub fn clear_current(&mut self) {
        if let Some(idx) = self.current {
            self.items.remove(idx);
            self.current = if self.items.is_empty() {
                None
            } else {
                Some(idx.min(self.items.len() - 1))
            };
        }
        self.view = ViewTransform::default();
    }

    /// Drop every image and reset the cursor and view
    pub fn clear_all(&mut self) {
        self.items.clear();
        self.current = None;
        self.view = ViewTransform::default();
    }
}

/// Whether the file extension is one of `IMAGE_EXTENSIONS`, compared exactly
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::canvas::Color;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Texture handle that records when it is released
    pub(crate) struct CountedTexture {
        texture: Texture,
        releases: Rc<Cell<usize>>,
    }

    impl Borrow<Texture> for CountedTexture {
        fn borrow(&self) -> &Texture {
            &self.texture
        }
    }

    impl Drop for CountedTexture {
        fn drop(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    /// Loads anything whose file name does not contain "corrupt"
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub sizes: HashMap<PathBuf, (u32, u32)>,
        pub releases: Rc<Cell<usize>>,
    }

    impl FakeSource {
        pub(crate) fn with_size(mut self, path: &str, width: u32, height: u32) -> Self {
            self.sizes.insert(PathBuf::from(path), (width, height));
            self
        }
    }

    impl ImageSource for FakeSource {
        type Handle = CountedTexture;

        fn load(&mut self, path: &Path) -> Result<Decoded<CountedTexture>, LoadError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.contains("corrupt") {
                return Err(LoadError::Upload {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                });
            }
            let (width, height) = self.sizes.get(path).copied().unwrap_or((400, 300));
            Ok(Decoded {
                handle: CountedTexture {
                    texture: Texture::solid(1, 1, Color::rgb(200, 10, 10)),
                    releases: Rc::clone(&self.releases),
                },
                width,
                height,
            })
        }
    }

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
        top_inset: 35,
    };

    fn collection_of(n: usize) -> ImageCollection<FakeSource> {
        let mut collection = ImageCollection::new(FakeSource::default());
        for i in 0..n {
            collection
                .load_image(Path::new(&format!("/img/{i}.png")))
                .expect("fake load failed");
        }
        if n > 0 {
            collection.current = Some(0);
            collection.refit(VIEWPORT);
        }
        collection
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"fake image data").expect("failed to write file");
    }

    #[test]
    fn new_collection_is_empty() {
        let collection = ImageCollection::new(FakeSource::default());
        assert!(collection.is_empty());
        assert_eq!(collection.current_index(), None);
        assert_eq!(collection.view(), ViewTransform::default());
        assert!(collection.dest_rect().is_none());
    }

    #[test]
    fn load_image_appends_without_moving_the_cursor() {
        let mut collection = ImageCollection::new(FakeSource::default());
        collection.load_image(Path::new("/a.png")).unwrap();
        collection.load_image(Path::new("/a.png")).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.current_index(), None);
    }

    #[test]
    fn failed_load_leaves_items_unchanged() {
        let mut collection = collection_of(2);
        assert!(collection.load_image(Path::new("/corrupt.png")).is_err());
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.current_index(), Some(0));
    }

    #[test]
    fn open_single_fits_and_centers() {
        let source = FakeSource::default().with_size("/photo.jpg", 1600, 1200);
        let mut collection = ImageCollection::new(source);
        collection
            .open_single(Path::new("/photo.jpg"), VIEWPORT)
            .unwrap();

        assert_eq!(collection.current_index(), Some(0));
        let view = collection.view();
        // min(800/1600, 565/1200)
        assert!((view.scale - 565.0 / 1200.0).abs() < 1e-6);
        let (w, h) = collection.scaled_size().unwrap();
        assert_eq!(view.offset_x, (800 - w) / 2);
        assert_eq!(view.offset_y, 35 + (600 - 35 - h) / 2);
        assert_eq!(
            collection.current().unwrap().source_path(),
            Path::new("/photo.jpg")
        );
    }

    #[test]
    fn open_single_failure_empties_the_collection() {
        let mut collection = collection_of(3);
        assert!(collection
            .open_single(Path::new("/corrupt.png"), VIEWPORT)
            .is_err());
        assert!(collection.is_empty());
        assert_eq!(collection.current_index(), None);
        assert_eq!(collection.source.releases.get(), 3);
    }

    #[test]
    fn fit_never_goes_below_minimum_scale() {
        let source = FakeSource::default().with_size("/huge.png", 100_000, 100_000);
        let mut collection = ImageCollection::new(source);
        collection.open_single(Path::new("/huge.png"), VIEWPORT).unwrap();
        assert_eq!(collection.view().scale, MIN_VIEW_SCALE);

        collection.fit_to_window(-20, 0);
        assert_eq!(collection.view().scale, MIN_VIEW_SCALE);
    }

    #[test]
    fn fit_may_upscale_small_images() {
        let source = FakeSource::default().with_size("/icon.png", 10, 10);
        let mut collection = ImageCollection::new(source);
        collection.open_single(Path::new("/icon.png"), VIEWPORT).unwrap();
        assert!((collection.view().scale - 56.5).abs() < 1e-4);
    }

    #[test]
    fn fit_keeps_at_least_one_axis_within_bounds() {
        let sizes = [(1, 1), (37, 5000), (4000, 3), (640, 480), (1920, 1080)];
        let windows = [(1, 1), (50, 900), (800, 600), (3840, 2160), (333, 77)];
        for &(iw, ih) in &sizes {
            let source = FakeSource::default().with_size("/x.png", iw, ih);
            let mut collection = ImageCollection::new(source);
            collection.load_image(Path::new("/x.png")).unwrap();
            collection.current = Some(0);
            for &(w, h) in &windows {
                collection.fit_to_window(w, h);
                let scale = collection.view().scale;
                assert!(scale >= MIN_VIEW_SCALE);
                let (sw, sh) = collection.scaled_size().unwrap();
                if scale > MIN_VIEW_SCALE {
                    assert!(sw <= w && sh <= h, "{iw}x{ih} in {w}x{h} -> {sw}x{sh}");
                }
            }
        }
    }

    #[test]
    fn refit_is_idempotent() {
        let mut collection = collection_of(1);
        let first = collection.view();
        collection.refit(VIEWPORT);
        collection.refit(VIEWPORT);
        assert_eq!(collection.view(), first);
    }

    #[test]
    fn navigation_walks_without_wrapping() {
        let n = 4;
        let mut collection = collection_of(n);
        assert!(!collection.previous(VIEWPORT));
        assert_eq!(collection.current_index(), Some(0));

        for _ in 0..n - 1 {
            assert!(collection.next(VIEWPORT));
        }
        assert_eq!(collection.current_index(), Some(n - 1));
        assert!(!collection.next(VIEWPORT));
        assert_eq!(collection.current_index(), Some(n - 1));

        assert!(collection.previous(VIEWPORT));
        assert_eq!(collection.current_index(), Some(n - 2));
    }

    #[test]
    fn navigation_needs_more_than_one_image() {
        let mut collection = collection_of(1);
        assert!(!collection.next(VIEWPORT));
        assert!(!collection.previous(VIEWPORT));

        let mut empty = collection_of(0);
        assert!(!empty.next(VIEWPORT));
        assert_eq!(empty.current_index(), None);
    }

    #[test]
    fn navigation_refits_the_new_image() {
        let source = FakeSource::default()
            .with_size("/a.png", 100, 100)
            .with_size("/b.png", 1000, 100);
        let mut collection = ImageCollection::new(source);
        collection.load_image(Path::new("/a.png")).unwrap();
        collection.load_image(Path::new("/b.png")).unwrap();
        collection.current = Some(0);
        collection.refit(VIEWPORT);
        assert!((collection.view().scale - 5.65).abs() < 1e-4);

        collection.next(VIEWPORT);
        assert!((collection.view().scale - 0.8).abs() < 1e-6);
    }

    #[test]
    fn clear_current_clamps_the_cursor_and_resets_the_view() {
        let mut collection = collection_of(3);
        collection.next(VIEWPORT);
        collection.next(VIEWPORT);
        collection.clear_current();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.current_index(), Some(1));
        assert_eq!(collection.view(), ViewTransform::default());
        assert_eq!(collection.source.releases.get(), 1);

        collection.clear_current();
        collection.clear_current();
        assert!(collection.is_empty());
        assert_eq!(collection.current_index(), None);
        assert_eq!(collection.source.releases.get(), 3);

        collection.clear_current();
        assert_eq!(collection.source.releases.get(), 3);
    }

    #[test]
    fn clear_all_releases_each_handle_once() {
        let mut collection = collection_of(5);
        collection.clear_all();
        assert_eq!(collection.len(), 0);
        assert_eq!(collection.current_index(), None);
        assert_eq!(collection.view(), ViewTransform::default());
        assert_eq!(collection.source.releases.get(), 5);

        collection.clear_all();
        assert_eq!(collection.source.releases.get(), 5);
    }

    #[test]
    fn open_folder_filters_by_extension() {
        let dir = tempdir().expect("failed to create temp dir");
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.jpg");
        touch(dir.path(), "c.tiff");
        touch(dir.path(), "notes.txt");

        let mut collection = ImageCollection::new(FakeSource::default());
        let summary = collection.open_folder(dir.path(), VIEWPORT).unwrap();
        assert_eq!(collection.len(), 3);
        assert_eq!(summary, FolderSummary { loaded: 3, skipped: 0 });
        assert_eq!(collection.current_index(), Some(0));
    }

    #[test]
    fn open_folder_keeps_directory_listing_order() {
        let dir = tempdir().expect("failed to create temp dir");
        for name in ["m.png", "a.jpg", "z.bmp", "k.tif", "b.jpeg", "skip.txt"] {
            touch(dir.path(), name);
        }

        let listed: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| has_image_extension(path))
            .collect();

        let mut collection = ImageCollection::new(FakeSource::default());
        collection.open_folder(dir.path(), VIEWPORT).unwrap();
        let opened: Vec<PathBuf> = collection
            .items
            .iter()
            .map(|item| item.source_path().to_path_buf())
            .collect();
        assert_eq!(opened, listed);
    }

    #[test]
    fn open_folder_skips_corrupt_files() {
        let dir = tempdir().expect("failed to create temp dir");
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.bmp");
        touch(dir.path(), "corrupt.jpeg");

        let mut collection = ImageCollection::new(FakeSource::default());
        let summary = collection.open_folder(dir.path(), VIEWPORT).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(summary, FolderSummary { loaded: 2, skipped: 1 });
    }

    #[test]
    fn open_folder_is_not_recursive_and_ignores_directories() {
        let dir = tempdir().expect("failed to create temp dir");
        touch(dir.path(), "top.png");
        let nested = dir.path().join("nested.png");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "inner.png");

        let mut collection = ImageCollection::new(FakeSource::default());
        collection.open_folder(dir.path(), VIEWPORT).unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn open_folder_without_images_is_empty() {
        let dir = tempdir().expect("failed to create temp dir");
        touch(dir.path(), "readme.md");

        let mut collection = collection_of(2);
        collection.open_folder(dir.path(), VIEWPORT).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.current_index(), None);
        assert_eq!(collection.source.releases.get(), 2);
    }

    #[test]
    fn open_folder_on_missing_path_is_an_error() {
        let dir = tempdir().expect("failed to create temp dir");
        let mut collection = collection_of(1);
        let err = collection
            .open_folder(&dir.path().join("gone"), VIEWPORT)
            .unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));
        assert!(collection.is_empty());
    }

    #[test]
    fn extension_matching_is_case_sensitive() {
        assert!(has_image_extension(Path::new("/x/a.png")));
        assert!(has_image_extension(Path::new("/x/a.tif")));
        assert!(!has_image_extension(Path::new("/x/a.PNG")));
        assert!(!has_image_extension(Path::new("/x/a.gif")));
        assert!(!has_image_extension(Path::new("/x/png")));
    }

    #[test]
    fn open_folder_with_real_decoder() {
        use crate::image_loader::Decoder;
        use image::{Rgba, RgbaImage};

        let dir = tempdir().expect("failed to create temp dir");
        for name in ["one.png", "two.png"] {
            RgbaImage::from_pixel(4, 4, Rgba([0, 128, 255, 255]))
                .save(dir.path().join(name))
                .expect("failed to write png");
        }
        fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let mut collection = ImageCollection::new(Decoder);
        let summary = collection.open_folder(dir.path(), VIEWPORT).unwrap();
        assert_eq!(summary, FolderSummary { loaded: 2, skipped: 1 });
        assert_eq!(collection.current().unwrap().texture().width(), 4);
    }
}
