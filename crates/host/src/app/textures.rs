use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use hellgate::surface::SurfaceError;
use hellgate::{ChannelLayout, ColorMask, Rect, SurfaceHost, SurfaceInfo, TextureHandle};
use image::ImageReader;
use tracing::{debug, info, warn};

use super::config::TextureConfig;

static TEXTURE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_texture_lock_poison_once(operation: &'static str) {
    if TEXTURE_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "texture lock poisoned; recovered inner value");
    }
}

/// BGRA pixel storage of one realized texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TexturePixels {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) bgra: Vec<u8>,
}

/// Pixel storage shared between the registry (writer) and the renderer
/// (reader).
#[derive(Clone, Debug, Default)]
pub(crate) struct TextureStore {
    textures: Arc<RwLock<HashMap<TextureHandle, TexturePixels>>>,
}

impl TextureStore {
    pub(crate) fn with_pixels_mut<R>(
        &self,
        handle: TextureHandle,
        f: impl FnOnce(&mut TexturePixels) -> R,
    ) -> Option<R> {
        let mut guard = match self.textures.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_texture_lock_poison_once("write");
                poisoned.into_inner()
            }
        };
        guard.get_mut(&handle).map(f)
    }

    pub(crate) fn with_pixels<R>(
        &self,
        handle: TextureHandle,
        f: impl FnOnce(&TexturePixels) -> R,
    ) -> Option<R> {
        let guard = match self.textures.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_texture_lock_poison_once("read");
                poisoned.into_inner()
            }
        };
        guard.get(&handle).map(f)
    }

    fn insert(&self, handle: TextureHandle, pixels: TexturePixels) {
        match self.textures.write() {
            Ok(mut guard) => {
                guard.insert(handle, pixels);
            }
            Err(poisoned) => {
                warn_texture_lock_poison_once("insert");
                poisoned.into_inner().insert(handle, pixels);
            }
        }
    }

    fn clear(&self) {
        match self.textures.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => {
                warn_texture_lock_poison_once("clear");
                poisoned.into_inner().clear();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrawRequest {
    pub(crate) texture: TextureHandle,
    pub(crate) dest: Rect,
    pub(crate) mask: ColorMask,
}

#[derive(Debug)]
struct TextureEntry {
    width: u32,
    height: u32,
    source: Option<PathBuf>,
    texture: Option<TextureHandle>,
}

/// Declared image resources addressed by path. Textures are realized lazily:
/// a materialization request is honored at the end of the frame, so the
/// texture shows up on the next lookup.
#[derive(Debug)]
pub(crate) struct TextureRegistry {
    entries: HashMap<String, TextureEntry>,
    pending_materialize: Vec<String>,
    draw_requests: Vec<DrawRequest>,
    store: TextureStore,
    next_handle: u32,
    warned_sources: HashSet<PathBuf>,
}

impl TextureRegistry {
    pub(crate) fn from_config(textures: &[TextureConfig]) -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
            pending_materialize: Vec::new(),
            draw_requests: Vec::new(),
            store: TextureStore::default(),
            next_handle: 0,
            warned_sources: HashSet::new(),
        };
        for texture in textures {
            registry.declare(texture);
        }
        registry
    }

    pub(crate) fn declare(&mut self, texture: &TextureConfig) {
        if texture.width == 0 || texture.height == 0 {
            warn!(path = texture.path.as_str(), "texture_declaration_zero_sized");
            return;
        }
        self.entries.insert(
            texture.path.clone(),
            TextureEntry {
                width: texture.width,
                height: texture.height,
                source: texture.source.clone(),
                texture: None,
            },
        );
    }

    pub(crate) fn store(&self) -> &TextureStore {
        &self.store
    }

    /// Realizes every texture requested since the last call.
    pub(crate) fn realize_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_materialize);
        for path in pending {
            let Some(entry) = self.entries.get(&path) else {
                continue;
            };
            if entry.texture.is_some() {
                continue;
            }
            let (width, height) = (entry.width, entry.height);
            let bgra = match entry.source.clone() {
                Some(source) => self.load_source_or_blank(&source, width, height),
                None => blank_pixels(width, height),
            };

            self.next_handle = self.next_handle.wrapping_add(1);
            let handle = TextureHandle(self.next_handle);
            self.store.insert(
                handle,
                TexturePixels {
                    width,
                    height,
                    bgra,
                },
            );
            if let Some(entry) = self.entries.get_mut(&path) {
                entry.texture = Some(handle);
            }
            info!(path = path.as_str(), width, height, "texture_realized");
        }
    }

    /// Map loads drop every realized texture; they are realized again on
    /// request.
    pub(crate) fn unload_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.texture = None;
        }
        self.pending_materialize.clear();
        self.draw_requests.clear();
        self.store.clear();
        debug!("textures_unloaded");
    }

    pub(crate) fn drain_draw_requests_into(&mut self, out: &mut Vec<DrawRequest>) {
        out.append(&mut self.draw_requests);
    }

    fn load_source_or_blank(&mut self, source: &Path, width: u32, height: u32) -> Vec<u8> {
        match load_png_bgra(source, width, height) {
            Ok(bgra) => bgra,
            Err(reason) => {
                if self.warned_sources.insert(source.to_path_buf()) {
                    warn!(
                        path = %source.display(),
                        reason = reason.as_str(),
                        "texture_source_load_failed_using_blank"
                    );
                }
                blank_pixels(width, height)
            }
        }
    }
}

impl SurfaceHost for TextureRegistry {
    fn lookup_surface(&self, path: &str) -> Option<SurfaceInfo> {
        self.entries.get(path).map(|entry| SurfaceInfo {
            width: entry.width,
            height: entry.height,
            layout: ChannelLayout::Bgra,
            texture: entry.texture,
        })
    }

    fn materialize_texture(&mut self, path: &str) {
        if !self.pending_materialize.iter().any(|pending| pending == path) {
            self.pending_materialize.push(path.to_string());
        }
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), SurfaceError> {
        self.store
            .with_pixels_mut(texture, |pixels| write(pixels.bgra.as_mut_slice()))
            .ok_or(SurfaceError::UnknownTexture(texture))
    }

    fn draw_texture(&mut self, texture: TextureHandle, dest: Rect, mask: ColorMask) {
        self.draw_requests.push(DrawRequest {
            texture,
            dest,
            mask,
        });
    }
}

fn blank_pixels(width: u32, height: u32) -> Vec<u8> {
    vec![0; width as usize * height as usize * 4]
}

fn load_png_bgra(path: &Path, width: u32, height: u32) -> Result<Vec<u8>, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    if image.width() != width || image.height() != height {
        return Err(format!(
            "size_mismatch:{}x{} (declared {width}x{height})",
            image.width(),
            image.height()
        ));
    }
    let mut bgra = image.into_raw();
    for pixel in bgra.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    Ok(bgra)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const SCREEN: &str = "ui\\hellgate\\screen";

    fn registry_with_screen(source: Option<PathBuf>) -> TextureRegistry {
        TextureRegistry::from_config(&[TextureConfig {
            path: SCREEN.to_string(),
            width: 4,
            height: 2,
            source,
        }])
    }

    fn handle_of(registry: &TextureRegistry) -> Option<TextureHandle> {
        registry.lookup_surface(SCREEN).and_then(|info| info.texture)
    }

    #[test]
    fn lookup_reports_declared_size_and_no_texture_until_realized() {
        let mut registry = registry_with_screen(None);

        let info = registry.lookup_surface(SCREEN).expect("declared");
        assert_eq!((info.width, info.height), (4, 2));
        assert_eq!(info.layout, ChannelLayout::Bgra);
        assert_eq!(info.texture, None);
        assert!(registry.lookup_surface("ui\\other").is_none());

        registry.materialize_texture(SCREEN);
        assert_eq!(handle_of(&registry), None);

        registry.realize_pending();
        let handle = handle_of(&registry).expect("realized");
        assert_eq!(
            registry.store().with_pixels(handle, |pixels| pixels.bgra.len()),
            Some(32)
        );
    }

    #[test]
    fn repeated_materialize_requests_realize_once() {
        let mut registry = registry_with_screen(None);
        registry.materialize_texture(SCREEN);
        registry.materialize_texture(SCREEN);
        registry.materialize_texture("ui\\undeclared");

        registry.realize_pending();
        let first = handle_of(&registry);
        registry.materialize_texture(SCREEN);
        registry.realize_pending();

        assert_eq!(first, Some(TextureHandle(1)));
        assert_eq!(handle_of(&registry), first);
    }

    #[test]
    fn write_texture_runs_closure_over_storage() {
        let mut registry = registry_with_screen(None);
        registry.materialize_texture(SCREEN);
        registry.realize_pending();
        let handle = handle_of(&registry).expect("realized");

        registry
            .write_texture(handle, &mut |pixels| pixels.fill(7))
            .expect("write");

        assert_eq!(
            registry
                .store()
                .with_pixels(handle, |pixels| pixels.bgra.iter().all(|byte| *byte == 7)),
            Some(true)
        );
        assert_eq!(
            registry.write_texture(TextureHandle(99), &mut |_| {}),
            Err(SurfaceError::UnknownTexture(TextureHandle(99)))
        );
    }

    #[test]
    fn unload_all_drops_realized_textures() {
        let mut registry = registry_with_screen(None);
        registry.materialize_texture(SCREEN);
        registry.realize_pending();
        let handle = handle_of(&registry).expect("realized");
        let dest = Rect {
            x: 0,
            y: 0,
            width: 4,
            height: 2,
        };
        registry.draw_texture(handle, dest, ColorMask::OPAQUE_WHITE);

        registry.unload_all();

        assert_eq!(handle_of(&registry), None);
        assert!(registry.store().with_pixels(handle, |_| ()).is_none());
        let mut draws = Vec::new();
        registry.drain_draw_requests_into(&mut draws);
        assert!(draws.is_empty());
    }

    #[test]
    fn png_source_is_decoded_into_bgra() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("screen.png");
        let mut image = image::RgbaImage::new(4, 2);
        image.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        image.save(&path).expect("save png");

        let mut registry = registry_with_screen(Some(path));
        registry.materialize_texture(SCREEN);
        registry.realize_pending();
        let handle = handle_of(&registry).expect("realized");

        let first_pixel = registry
            .store()
            .with_pixels(handle, |pixels| pixels.bgra[..4].to_vec())
            .expect("pixels");
        assert_eq!(first_pixel, vec![30, 20, 10, 255]);
    }

    #[test]
    fn missing_or_mis_sized_source_falls_back_to_blank() {
        let dir = tempfile::tempdir().expect("temp dir");
        let wrong_size = dir.path().join("wrong.png");
        image::RgbaImage::new(3, 3).save(&wrong_size).expect("save png");

        for source in [dir.path().join("missing.png"), wrong_size] {
            let mut registry = registry_with_screen(Some(source));
            registry.materialize_texture(SCREEN);
            registry.realize_pending();
            let handle = handle_of(&registry).expect("realized");
            assert_eq!(
                registry
                    .store()
                    .with_pixels(handle, |pixels| pixels.bgra.clone()),
                Some(vec![0; 32])
            );
        }
    }

    #[test]
    fn zero_sized_declarations_are_skipped() {
        let registry = TextureRegistry::from_config(&[TextureConfig {
            path: "ui\\empty".to_string(),
            width: 0,
            height: 200,
            source: None,
        }]);
        assert!(registry.lookup_surface("ui\\empty").is_none());
    }

    #[test]
    fn store_recovers_after_poison_without_panic() {
        let mut registry = registry_with_screen(None);
        registry.materialize_texture(SCREEN);
        registry.realize_pending();
        let handle = handle_of(&registry).expect("realized");
        let store = registry.store().clone();

        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _ = store.with_pixels_mut(handle, |_| panic!("poison texture lock"));
                })
                .join();
        });

        registry
            .write_texture(handle, &mut |pixels| pixels[0] = 1)
            .expect("write after poison");
        assert_eq!(store.with_pixels(handle, |pixels| pixels.bgra[0]), Some(1));
    }
}
