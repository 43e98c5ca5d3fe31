// Wayland integration module
// Handles all Wayland-specific functionality using smithay-client-toolkit

use crate::app::{ViewerController, WELCOME_TITLE};
use crate::canvas::Canvas;
use crate::image_loader::Decoder;
use crate::input::{InputEvent, Key, Modifiers, PointerButton, WindowControl};
use crate::text::CosmicText;
use crate::wgpu_renderer::WgpuRenderer;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_pointer, delegate_registry, delegate_seat,
    delegate_shm, delegate_xdg_shell, delegate_xdg_window,
    reexports::{
        calloop::EventLoop, calloop_wayland_source::WaylandSource, csd_frame::WindowState,
    },
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers as KeyboardModifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        xdg::{
            window::{Window, WindowConfigure, WindowDecorations, WindowHandler},
            XdgShell,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use std::num::NonZeroU32;
use std::time::Duration;
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, Proxy, QueueHandle,
};

/// Mouse button constants
const BTN_LEFT: u32 = 272;
const BTN_RIGHT: u32 = 273;
const BTN_MIDDLE: u32 = 274;

/// Minimum window size
const MIN_WIDTH: u32 = 320;
const MIN_HEIGHT: u32 = 240;

/// Maximum window size to prevent buffer allocation failures
const MAX_SIZE: u32 = 8192;

/// Upper bound on how long the loop sleeps waiting for events
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Forwards viewer window requests to the xdg toplevel
struct XdgWindowControl<'a> {
    window: &'a Window,
}

impl WindowControl for XdgWindowControl<'_> {
    fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen {
            self.window.set_fullscreen(None);
        } else {
            self.window.unset_fullscreen();
        }
    }

    fn minimize(&mut self) {
        self.window.set_minimized();
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}

/// Main Wayland application state
struct WaylandApp {
    // Registry state
    registry_state: RegistryState,
    // Seat state for input handling
    seat_state: SeatState,
    // Shared memory for buffer allocation
    shm: Shm,
    // Kept alive for the lifetime of the window
    _xdg_shell: XdgShell,
    _compositor_state: CompositorState,

    // Wayland display pointer (for GPU rendering)
    display_ptr: *mut std::ffi::c_void,

    // Viewer state and the frame it renders into
    viewer: ViewerController<Decoder>,
    text: CosmicText,
    frame: Canvas,

    // GPU rendering; dropped before the window surface
    use_gpu: bool,
    gpu_renderer: Option<WgpuRenderer>,
    gpu_initialized: bool,

    // Surface and buffer management
    window: Window,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,

    // Last fullscreen state the compositor reported, and the size to return to
    fullscreen: bool,
    windowed_size: (u32, u32),

    // Keyboard modifier state
    modifiers: Modifiers,
}

impl WaylandApp {
    /// Hand one translated event to the viewer
    fn dispatch_input(&mut self, event: InputEvent) {
        let mut control = XdgWindowControl {
            window: &self.window,
        };
        self.viewer.handle_event(&event, &mut control);
    }

    /// Deliver a finished background file dialog
    fn poll_picker(&mut self) {
        let mut control = XdgWindowControl {
            window: &self.window,
        };
        self.viewer.poll_picker(&mut control);
    }

    /// Initialize GPU renderer from Wayland surface
    fn init_gpu_renderer(&mut self) {
        if self.gpu_initialized {
            return;
        }
        self.gpu_initialized = true;

        // With wayland-backend client_system feature, ObjectId.as_ptr() is available
        let surface_ptr = self.window.wl_surface().id().as_ptr() as *mut std::ffi::c_void;
        let display_ptr = self.display_ptr;

        if display_ptr.is_null() {
            warn!("Display pointer is null, falling back to CPU rendering");
            self.use_gpu = false;
            return;
        }

        info!("Initializing GPU renderer...");
        debug!("  Surface ptr: {:?}", surface_ptr);
        debug!("  Display ptr: {:?}", display_ptr);

        match WgpuRenderer::new(display_ptr, surface_ptr, self.width, self.height) {
            Ok(renderer) => {
                self.gpu_renderer = Some(renderer);
                info!("GPU renderer initialized successfully");
            }
            Err(e) => {
                warn!("Failed to initialize GPU renderer: {:?}", e);
                warn!("Falling back to CPU rendering");
                self.use_gpu = false;
            }
        }
    }

    /// Compose a frame and present it
    fn draw(&mut self) {
        if !self.configured {
            return;
        }

        if self.frame.width() != self.width || self.frame.height() != self.height {
            self.frame.resize(self.width, self.height);
        }
        self.viewer.render(&mut self.frame, &mut self.text);

        // Try GPU presentation first if enabled
        if self.use_gpu && self.draw_gpu() {
            return;
        }

        self.draw_cpu();
    }

    /// Present using GPU (wgpu)
    fn draw_gpu(&mut self) -> bool {
        let renderer = match self.gpu_renderer.as_mut() {
            Some(r) => r,
            None => return false,
        };

        match renderer.present(&self.frame) {
            Ok(true) => {
                self.window.wl_surface().commit();
                true
            }
            Ok(false) => {
                // Skipped frame
                false
            }
            Err(e) => {
                warn!("GPU render error: {:?}, falling back to CPU", e);
                self.use_gpu = false;
                self.gpu_renderer = None;
                false
            }
        }
    }

    /// Present using CPU (shared memory buffer)
    fn draw_cpu(&mut self) {
        let width = self.frame.width();
        let height = self.frame.height();

        // Calculate buffer size (4 bytes per pixel for ARGB)
        let stride = width as i32 * 4;
        let buffer_size = width as usize * height as usize * 4;

        // Initialize pool if needed
        if self.pool.is_none() {
            match SlotPool::new(buffer_size, &self.shm) {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    error!(
                        "Failed to create slot pool: {}. Buffer size: {} bytes",
                        e, buffer_size
                    );
                    return;
                }
            }
        }

        let Some(pool) = self.pool.as_mut() else {
            return;
        };

        // Resize pool if needed
        if pool.len() < buffer_size {
            if let Err(e) = pool.resize(buffer_size) {
                error!("Failed to resize pool to {} bytes: {}", buffer_size, e);
                self.pool = None;
                return;
            }
        }

        let (buffer, canvas) = match pool.create_buffer(
            width as i32,
            height as i32,
            stride,
            wl_shm::Format::Argb8888,
        ) {
            Ok(buf) => buf,
            Err(e) => {
                error!("Failed to create buffer {}x{}: {}", width, height, e);
                return;
            }
        };

        // Argb8888 is little-endian, so its byte order matches the BGRA frame
        let pixels = self.frame.pixels();
        let len = pixels.len().min(canvas.len());
        canvas[..len].copy_from_slice(&pixels[..len]);

        let surface = self.window.wl_surface();
        if let Err(e) = buffer.attach_to(surface) {
            error!("Failed to attach buffer: {}", e);
            return;
        }
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.buffer = Some(buffer);
    }
}

/// Size to use for a configure event
///
/// A missing dimension keeps the current one, except when leaving fullscreen,
/// where the size from before fullscreen comes back.
fn configured_size(
    suggested: (Option<NonZeroU32>, Option<NonZeroU32>),
    current: (u32, u32),
    windowed: (u32, u32),
    leaving_fullscreen: bool,
) -> (u32, u32) {
    let fallback = if leaving_fullscreen { windowed } else { current };
    let width = suggested.0.map_or(fallback.0, |w| w.get()).clamp(1, MAX_SIZE);
    let height = suggested.1.map_or(fallback.1, |h| h.get()).clamp(1, MAX_SIZE);
    (width, height)
}

/// Map an xkb keysym to the keys the viewer understands
fn translate_key(keysym: Keysym) -> Key {
    match keysym {
        Keysym::Escape => Key::Escape,
        Keysym::F11 => Key::F11,
        Keysym::Left => Key::Left,
        Keysym::Right => Key::Right,
        other => other.key_char().map(Key::Char).unwrap_or(Key::Other),
    }
}

/// Map a Linux input button code
fn translate_button(button: u32) -> PointerButton {
    match button {
        BTN_LEFT => PointerButton::Left,
        BTN_RIGHT => PointerButton::Right,
        BTN_MIDDLE => PointerButton::Middle,
        other => PointerButton::Other(other),
    }
}

// Implement required traits for smithay-client-toolkit

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("Scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl WindowHandler for WaylandApp {
    fn request_close(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _window: &Window) {
        info!("Window close requested");
        self.dispatch_input(InputEvent::Quit);
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _window: &Window,
        configure: WindowConfigure,
        _serial: u32,
    ) {
        let fullscreen = configure.state.contains(WindowState::FULLSCREEN);
        debug!(
            "Window configured: {:?} (fullscreen: {})",
            configure.new_size, fullscreen
        );

        let current = (self.width, self.height);
        let leaving_fullscreen = self.fullscreen && !fullscreen;
        if fullscreen && !self.fullscreen {
            self.windowed_size = current;
        }
        let (width, height) = configured_size(
            configure.new_size,
            current,
            self.windowed_size,
            leaving_fullscreen,
        );

        let first_configure = !self.configured;
        self.configured = true;

        // Initialize GPU renderer if requested and not yet initialized
        if self.use_gpu && !self.gpu_initialized {
            self.init_gpu_renderer();
        }

        if fullscreen != self.fullscreen {
            self.fullscreen = fullscreen;
            self.dispatch_input(InputEvent::FullscreenChanged { fullscreen });
        }

        if first_configure || width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.dispatch_input(InputEvent::Resized { width, height });
        } else {
            self.dispatch_input(InputEvent::Exposed);
        }
    }
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard {
            if let Err(e) = self.seat_state.get_keyboard(qh, &seat, None) {
                error!("Failed to get keyboard: {}", e);
            }
        }
        if capability == Capability::Pointer {
            if let Err(e) = self.seat_state.get_pointer(qh, &seat) {
                error!("Failed to get pointer: {}", e);
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        _capability: Capability,
    ) {
        debug!("Capability removed");
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        debug!("Key pressed: {:?}", event.keysym);
        let key = translate_key(event.keysym);
        self.dispatch_input(InputEvent::KeyPress {
            key,
            modifiers: self.modifiers,
        });
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        modifiers: KeyboardModifiers,
        _layout: u32,
    ) {
        self.modifiers = Modifiers {
            ctrl: modifiers.ctrl,
            shift: modifiers.shift,
            alt: modifiers.alt,
        };
    }
}

impl PointerHandler for WaylandApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            let (x, y) = event.position;
            let input = match event.kind {
                PointerEventKind::Enter { .. } | PointerEventKind::Motion { .. } => {
                    InputEvent::PointerMove { x, y }
                }
                // Clear hover highlights
                PointerEventKind::Leave { .. } => InputEvent::PointerMove { x: -1.0, y: -1.0 },
                PointerEventKind::Press { button, .. } => InputEvent::PointerPress {
                    x,
                    y,
                    button: translate_button(button),
                },
                PointerEventKind::Release { button, .. } => InputEvent::PointerRelease {
                    x,
                    y,
                    button: translate_button(button),
                },
                _ => continue,
            };
            self.dispatch_input(input);
        }
    }
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![SeatState];
}

// Delegate macros
delegate_compositor!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_pointer!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_xdg_shell!(WaylandApp);
delegate_xdg_window!(WaylandApp);
delegate_registry!(WaylandApp);

/// Run the Wayland application until the viewer stops
pub fn run(
    viewer: ViewerController<Decoder>,
    text: CosmicText,
    width: u32,
    height: u32,
    use_gpu: bool,
) -> Result<()> {
    info!("Connecting to Wayland display");

    // Connect to Wayland display
    let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;

    // Initialize registry and event queue
    let (globals, event_queue) =
        registry_queue_init(&conn).context("Failed to initialize registry")?;
    let qh = event_queue.handle();

    // Initialize required globals
    let compositor_state =
        CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
    let xdg_shell = XdgShell::bind(&globals, &qh).context("Failed to bind xdg shell")?;
    let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;

    // Get the display pointer for GPU rendering
    let display_ptr = conn.backend().display_ptr() as *mut std::ffi::c_void;

    // Create the toplevel window
    let surface = compositor_state.create_surface(&qh);
    let window = xdg_shell.create_window(surface, WindowDecorations::RequestServer, &qh);
    window.set_title(WELCOME_TITLE);
    window.set_app_id("rsview");
    window.set_min_size(Some((MIN_WIDTH, MIN_HEIGHT)));

    // Commit the surface to trigger configure
    window.commit();

    let mut app = WaylandApp {
        registry_state: RegistryState::new(&globals),
        seat_state: SeatState::new(&globals, &qh),
        shm,
        _xdg_shell: xdg_shell,
        _compositor_state: compositor_state,
        display_ptr,
        viewer,
        text,
        frame: Canvas::new(width, height),
        use_gpu,
        gpu_renderer: None,
        gpu_initialized: false,
        window,
        pool: None,
        buffer: None,
        width,
        height,
        configured: false,
        fullscreen: false,
        windowed_size: (width, height),
        modifiers: Modifiers::default(),
    };

    let mut event_loop: EventLoop<WaylandApp> =
        EventLoop::try_new().context("Failed to create event loop")?;
    WaylandSource::new(conn.clone(), event_queue)
        .insert(event_loop.handle())
        .map_err(|e| anyhow!("Failed to insert Wayland source: {}", e.error))?;

    info!("Starting event loop");
    info!("Controls: File menu to open, Left/Right to navigate, F11 fullscreen, Esc to exit");

    // Main event loop
    loop {
        event_loop
            .dispatch(Some(FRAME_INTERVAL), &mut app)
            .context("Wayland event dispatch failed")?;

        app.poll_picker();

        if !app.viewer.is_running() {
            info!("Exiting application");
            break;
        }

        if app.configured && app.viewer.take_redraw() {
            app.draw();
        }
    }

    let WaylandApp { text, .. } = app;
    text.shutdown();

    Ok(())
}
