// Application state module
// Routes input to the menu and the image collection and composes each frame

use crate::canvas::{Canvas, Color};
use crate::collection::ImageCollection;
use crate::geometry::{scale_factor_for, Rect, Viewport};
use crate::image_loader::ImageSource;
use crate::input::{InputEvent, Key, Modifiers, WindowControl};
use crate::menu::MenuController;
use crate::picker::{FilePicker, PickMode};
use crate::text::{self, SizeClass, TextRenderer, TextStyle};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Title shown before anything is opened
pub const WELCOME_TITLE: &str = "Image Viewer - Welcome";
const TITLE_PREFIX: &str = "Image Viewer - ";

const BACKGROUND_COLOR: Color = Color::rgb(0x20, 0x20, 0x20);
const WELCOME_TITLE_COLOR: Color = Color::rgb(240, 240, 240);
const WELCOME_TEXT_COLOR: Color = Color::rgb(200, 200, 200);
const WELCOME_HINT_COLOR: Color = Color::rgb(150, 150, 150);
const ERROR_TEXT_COLOR: Color = Color::rgb(255, 100, 100);

/// Open requests queued by the menu callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
enum OpenRequest {
    File(PathBuf),
    Folder(PathBuf),
}

type Inbox = Rc<RefCell<VecDeque<OpenRequest>>>;

/// Top-level viewer state, independent of the windowing system
pub struct ViewerController<S: ImageSource> {
    menu: MenuController,
    images: ImageCollection<S>,
    inbox: Inbox,

    /// Once set, the welcome screen is never shown again
    has_opened: bool,
    redraw_pending: bool,
    running: bool,

    window_width: u32,
    window_height: u32,
    is_fullscreen: bool,
    scale_factor: f32,
}

impl<S: ImageSource> ViewerController<S> {
    pub fn new(
        source: S,
        picker: Arc<dyn FilePicker>,
        pick_mode: PickMode,
        width: u32,
        height: u32,
    ) -> Self {
        let inbox: Inbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut menu = MenuController::new(picker, pick_mode);

        let files = Rc::clone(&inbox);
        menu.set_open_file_callback(move |path| {
            files
                .borrow_mut()
                .push_back(OpenRequest::File(path.to_path_buf()));
        });
        let folders = Rc::clone(&inbox);
        menu.set_open_folder_callback(move |path| {
            folders
                .borrow_mut()
                .push_back(OpenRequest::Folder(path.to_path_buf()));
        });

        let mut viewer = Self {
            menu,
            images: ImageCollection::new(source),
            inbox,
            has_opened: false,
            redraw_pending: true,
            running: true,
            window_width: width,
            window_height: height,
            is_fullscreen: false,
            scale_factor: 1.0,
        };
        viewer.handle_resize(width, height);
        viewer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Space below the menu bar available to the image
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.window_width,
            height: self.window_height,
            top_inset: self.menu.height(),
        }
    }

    /// Consume the redraw flag; true at most once per pending change
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw_pending, false)
    }

    /// Feed one platform event: the menu sees it first, then the viewer
    pub fn handle_event(&mut self, event: &InputEvent, window: &mut dyn WindowControl) {
        self.menu.handle_pointer_event(event);
        self.process_open_requests(window);

        match *event {
            InputEvent::Quit => {
                info!("Close requested");
                self.running = false;
            }
            InputEvent::KeyPress { key, modifiers } => self.handle_key(key, modifiers, window),
            InputEvent::Resized { width, height } => self.handle_resize(width, height),
            InputEvent::FullscreenChanged { fullscreen } if fullscreen != self.is_fullscreen => {
                info!("Compositor set fullscreen: {}", fullscreen);
                self.is_fullscreen = fullscreen;
            }
            _ => {}
        }

        if event.affects_display() {
            self.redraw_pending = true;
        }
    }

    /// Deliver a finished background pick, if any
    pub fn poll_picker(&mut self, window: &mut dyn WindowControl) {
        if self.menu.poll_pending() {
            self.process_open_requests(window);
            self.redraw_pending = true;
        }
    }

    fn handle_key(&mut self, key: Key, modifiers: Modifiers, window: &mut dyn WindowControl) {
        match key {
            Key::Escape if self.is_fullscreen => self.set_fullscreen(false, window),
            Key::Escape => {
                info!("Escape pressed, exiting");
                self.running = false;
            }
            Key::F11 => self.set_fullscreen(!self.is_fullscreen, window),
            Key::Char(c) if modifiers.ctrl && c.eq_ignore_ascii_case(&'m') => {
                info!("Minimizing window");
                window.minimize();
            }
            Key::Char(c) if modifiers.ctrl && c.eq_ignore_ascii_case(&'q') => {
                info!("Ctrl+Q pressed, exiting");
                self.running = false;
            }
            Key::Left if self.images.len() > 1 => {
                let viewport = self.viewport();
                if self.images.previous(viewport) {
                    debug!("Showing image {:?}", self.images.current_index());
                }
            }
            Key::Right if self.images.len() > 1 => {
                let viewport = self.viewport();
                if self.images.next(viewport) {
                    debug!("Showing image {:?}", self.images.current_index());
                }
            }
            _ => {}
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool, window: &mut dyn WindowControl) {
        self.is_fullscreen = fullscreen;
        window.set_fullscreen(fullscreen);
        info!("Fullscreen: {}", fullscreen);
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
        self.scale_factor = scale_factor_for(width, height);
        self.menu.set_scale(self.scale_factor);
        self.menu.relayout(width, height);

        if self.images.current().is_some() {
            self.images.refit(self.viewport());
        }
        info!(
            "Window resized to {}x{}, scale factor {:.2}",
            width, height, self.scale_factor
        );
    }

    fn process_open_requests(&mut self, window: &mut dyn WindowControl) {
        loop {
            let Some(request) = self.inbox.borrow_mut().pop_front() else {
                break;
            };
            match request {
                OpenRequest::File(path) => self.open_file(&path, window),
                OpenRequest::Folder(path) => self.open_folder(&path, window),
            }
            self.redraw_pending = true;
        }
    }

    fn open_file(&mut self, path: &Path, window: &mut dyn WindowControl) {
        self.has_opened = true;
        match self.images.open_single(path, self.viewport()) {
            Ok(()) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                window.set_title(&format!("{TITLE_PREFIX}{name}"));
            }
            Err(e) => error!("Failed to load image: {}", e),
        }
    }

    fn open_folder(&mut self, path: &Path, window: &mut dyn WindowControl) {
        self.has_opened = true;
        match self.images.open_folder(path, self.viewport()) {
            Ok(summary) => {
                if summary.loaded == 0 {
                    warn!("No loadable images in {}", path.display());
                }
                window.set_title(&format!("{TITLE_PREFIX}{}", path.display()));
            }
            Err(e) => error!("Failed to open folder: {}", e),
        }
    }

    /// Compose the whole frame; the canvas must match the window size
    pub fn render(&self, canvas: &mut Canvas, text_renderer: &mut dyn TextRenderer) {
        canvas.clear(BACKGROUND_COLOR);

        if !self.has_opened {
            self.render_welcome(canvas, text_renderer);
        } else if let (Some(image), Some(dest)) = (self.images.current(), self.images.dest_rect())
        {
            canvas.draw_image(image.texture(), dest);
        } else {
            let area = self.content_area();
            text::draw_centered(
                canvas,
                text_renderer,
                "Failed to load image",
                area,
                TextStyle::new(ERROR_TEXT_COLOR, SizeClass::Medium, self.scale_factor),
            );
        }

        self.menu.render(canvas, text_renderer);
    }

    fn content_area(&self) -> Rect {
        let top = self.menu.height() as i32;
        Rect::new(
            0,
            top,
            self.window_width as i32,
            self.window_height as i32 - top,
        )
    }

    fn render_welcome(&self, canvas: &mut Canvas, text_renderer: &mut dyn TextRenderer) {
        let area = self.content_area();
        let f = self.scale_factor;
        let line = |offset: f32, height: f32| {
            let h = (height * f) as i32;
            let center_y = area.y + area.h / 2 + (offset * f) as i32;
            Rect::new(area.x, center_y - h / 2, area.w, h)
        };

        text::draw_centered(
            canvas,
            text_renderer,
            "Image Viewer",
            line(-50.0, 40.0),
            TextStyle::new(WELCOME_TITLE_COLOR, SizeClass::XLarge, f),
        );
        text::draw_centered(
            canvas,
            text_renderer,
            "Open File to Begin",
            line(0.0, 30.0),
            TextStyle::new(WELCOME_TEXT_COLOR, SizeClass::Medium, f),
        );
        text::draw_centered(
            canvas,
            text_renderer,
            "Use File menu or press F11 for fullscreen",
            line(40.0, 25.0),
            TextStyle::new(WELCOME_HINT_COLOR, SizeClass::Small, f),
        );

        let readout = format!("Scale: {:.0}%", f * 100.0);
        text::draw_at(
            canvas,
            text_renderer,
            &readout,
            10,
            self.window_height as i32 - 30,
            TextStyle::new(WELCOME_HINT_COLOR, SizeClass::Small, f),
        );
    }
}
