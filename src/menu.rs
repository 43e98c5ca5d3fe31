// Menu bar module
// A single "File" button with a dropdown of open actions

use crate::canvas::{Canvas, Color};
use crate::geometry::Rect;
use crate::input::{InputEvent, PointerButton};
use crate::picker::{FilePicker, PendingPick, PickKind, PickMode};
use crate::text::{self, SizeClass, TextRenderer, TextStyle};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Unscaled geometry
const BASE_MENU_HEIGHT: f32 = 35.0;
const BASE_BUTTON_WIDTH: f32 = 60.0;
const BASE_DROPDOWN_ITEM_HEIGHT: f32 = 25.0;
const BASE_DROPDOWN_WIDTH: f32 = 150.0;
const BUTTON_X: i32 = 5;
const ITEM_TEXT_INDENT: f32 = 10.0;

const BAR_COLOR: Color = Color::rgb(0xF8, 0xF8, 0xF8);
const BAR_SEPARATOR_COLOR: Color = Color::rgb(0xD0, 0xD0, 0xD0);
const BUTTON_HOVER_COLOR: Color = Color::rgb(0xF0, 0xF0, 0xF0);
const BUTTON_PRESSED_COLOR: Color = Color::rgb(0xE0, 0xE0, 0xE0);
const BUTTON_BORDER_COLOR: Color = Color::rgb(0xC0, 0xC0, 0xC0);
const DROPDOWN_BG_COLOR: Color = Color::rgb(240, 240, 240);
const DROPDOWN_BORDER_COLOR: Color = Color::rgb(180, 180, 180);
const ITEM_HOVER_COLOR: Color = Color::rgb(0xE8, 0xE8, 0xE8);
const TEXT_COLOR: Color = Color::rgb(50, 50, 50);
const TEXT_HOVER_COLOR: Color = Color::rgb(0, 0, 0);
const TEXT_DISABLED_COLOR: Color = Color::rgb(160, 160, 160);

/// Dropdown visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    Closed,
    Open,
}

/// Dropdown entries, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    OpenFile,
    OpenFolder,
    /// Listed but not implemented: selecting it only closes the dropdown
    OpenArchive,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [
        MenuAction::OpenFile,
        MenuAction::OpenFolder,
        MenuAction::OpenArchive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::OpenFile => "Open File",
            MenuAction::OpenFolder => "Open Folder",
            MenuAction::OpenArchive => "Open Archive",
        }
    }
}

/// Handler for a resolved path
pub type PathCallback = Box<dyn FnMut(&Path)>;

#[derive(Debug)]
struct DropdownItem {
    action: MenuAction,
    rect: Rect,
    hovered: bool,
}

pub struct MenuController {
    state: DropdownState,

    button_rect: Rect,
    button_hovered: bool,
    button_pressed: bool,
    items: Vec<DropdownItem>,

    // Scaled geometry
    scale_factor: f32,
    menu_height: i32,
    button_width: i32,
    item_height: i32,
    dropdown_width: i32,
    window_width: u32,

    picker: Arc<dyn FilePicker>,
    pick_mode: PickMode,
    pending: Option<PendingPick>,

    on_file_opened: Option<PathCallback>,
    on_folder_opened: Option<PathCallback>,
}

impl MenuController {
    pub fn new(picker: Arc<dyn FilePicker>, pick_mode: PickMode) -> Self {
        let mut menu = Self {
            state: DropdownState::Closed,
            button_rect: Rect::default(),
            button_hovered: false,
            button_pressed: false,
            items: MenuAction::ALL
                .iter()
                .map(|&action| DropdownItem {
                    action,
                    rect: Rect::default(),
                    hovered: false,
                })
                .collect(),
            scale_factor: 1.0,
            menu_height: 0,
            button_width: 0,
            item_height: 0,
            dropdown_width: 0,
            window_width: 800,
            picker,
            pick_mode,
            pending: None,
            on_file_opened: None,
            on_folder_opened: None,
        };
        menu.set_scale(1.0);
        menu.relayout(800, 600);
        menu
    }

    /// Replace the handler for "Open File" results
    pub fn set_open_file_callback(&mut self, callback: impl FnMut(&Path) + 'static) {
        self.on_file_opened = Some(Box::new(callback));
    }

    /// Replace the handler for "Open Folder" results
    pub fn set_open_folder_callback(&mut self, callback: impl FnMut(&Path) + 'static) {
        self.on_folder_opened = Some(Box::new(callback));
    }

    /// Recompute scaled sizes; call `relayout` afterwards
    pub fn set_scale(&mut self, factor: f32) {
        self.scale_factor = factor;
        self.menu_height = (BASE_MENU_HEIGHT * factor) as i32;
        self.button_width = (BASE_BUTTON_WIDTH * factor) as i32;
        self.item_height = (BASE_DROPDOWN_ITEM_HEIGHT * factor) as i32;
        self.dropdown_width = (BASE_DROPDOWN_WIDTH * factor) as i32;
        debug!("Menu scale factor set to: {}", factor);
    }

    /// Position the button and dropdown rows for the current scale
    pub fn relayout(&mut self, window_width: u32, window_height: u32) {
        self.window_width = window_width;
        self.button_rect = Rect::new(BUTTON_X, 0, self.button_width, self.menu_height);

        for (i, item) in self.items.iter_mut().enumerate() {
            item.rect = Rect::new(
                self.button_rect.x,
                self.button_rect.y + self.menu_height + i as i32 * self.item_height,
                self.dropdown_width,
                self.item_height,
            );
        }
        debug!(
            "Menu layout updated for window size: {}x{}",
            window_width, window_height
        );
    }

    /// Height of the menu bar, i.e. the space reserved above the image
    pub fn height(&self) -> u32 {
        self.menu_height.max(0) as u32
    }

    pub fn state(&self) -> DropdownState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DropdownState::Open
    }

    pub fn is_pick_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether clicking the action does anything right now
    pub fn is_enabled(&self, action: MenuAction) -> bool {
        match action {
            MenuAction::OpenFile | MenuAction::OpenFolder => self.pending.is_none(),
            MenuAction::OpenArchive => true,
        }
    }

    fn dropdown_rect(&self) -> Rect {
        Rect::new(
            self.button_rect.x,
            self.button_rect.y + self.menu_height,
            self.dropdown_width,
            self.items.len() as i32 * self.item_height,
        )
    }

    fn item_at(&self, x: f64, y: f64) -> Option<usize> {
        if !self.is_open() {
            return None;
        }
        self.items.iter().position(|item| item.rect.contains(x, y))
    }

    fn close(&mut self) {
        self.state = DropdownState::Closed;
        for item in &mut self.items {
            item.hovered = false;
        }
    }

    /// Feed a pointer event; other events are ignored
    pub fn handle_pointer_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PointerPress {
                x,
                y,
                button: PointerButton::Left,
            } => self.handle_press(x, y),
            InputEvent::PointerRelease {
                button: PointerButton::Left,
                ..
            } => {
                self.button_pressed = false;
            }
            InputEvent::PointerMove { x, y } => {
                self.button_hovered = self.button_rect.contains(x, y);
                if self.is_open() {
                    for item in &mut self.items {
                        item.hovered = item.rect.contains(x, y);
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_press(&mut self, x: f64, y: f64) {
        if self.button_rect.contains(x, y) {
            self.button_pressed = true;
            if self.is_open() {
                self.close();
            } else {
                self.state = DropdownState::Open;
            }
            return;
        }

        if !self.is_open() {
            return;
        }

        if let Some(idx) = self.item_at(x, y) {
            let action = self.items[idx].action;
            if self.is_enabled(action) {
                self.activate(action);
            } else {
                debug!("{} ignored while a pick is pending", action.label());
            }
        }
        self.close();
    }

    fn activate(&mut self, action: MenuAction) {
        info!("Menu: {} selected", action.label());
        let kind = match action {
            MenuAction::OpenFile => PickKind::File,
            MenuAction::OpenFolder => PickKind::Folder,
            MenuAction::OpenArchive => {
                info!("Opening archives is not supported");
                return;
            }
        };

        match self.pick_mode {
            PickMode::Blocking => {
                let result = match kind {
                    PickKind::File => self.picker.pick_file(),
                    PickKind::Folder => self.picker.pick_folder(),
                };
                self.deliver(kind, result.as_deref());
            }
            PickMode::Background => {
                self.pending = Some(PendingPick::spawn(Arc::clone(&self.picker), kind));
            }
        }
    }

    /// Pass a pick result to the registered handler; `None` means cancelled
    fn deliver(&mut self, kind: PickKind, path: Option<&Path>) {
        let Some(path) = path else {
            info!("No {:?} selected", kind);
            return;
        };
        info!("{:?} selected: {}", kind, path.display());

        let callback = match kind {
            PickKind::File => self.on_file_opened.as_mut(),
            PickKind::Folder => self.on_folder_opened.as_mut(),
        };
        if let Some(callback) = callback {
            callback(path);
        }
    }

    /// Collect a finished background pick; returns true if one resolved
    pub fn poll_pending(&mut self) -> bool {
        let Some(result) = self.pending.as_ref().and_then(PendingPick::poll) else {
            return false;
        };
        if let Some(pending) = self.pending.take() {
            self.deliver(pending.kind(), result.as_deref());
        }
        true
    }

    /// Draw the bar, the button and, when open, the dropdown on top
    pub fn render(&self, canvas: &mut Canvas, text_renderer: &mut dyn TextRenderer) {
        let bar = Rect::new(0, 0, self.window_width as i32, self.menu_height);
        canvas.fill_rect(bar, BAR_COLOR);
        canvas.draw_line(
            0,
            self.menu_height - 1,
            self.window_width as i32,
            self.menu_height - 1,
            BAR_SEPARATOR_COLOR,
        );

        self.draw_button(canvas, text_renderer);

        if self.is_open() {
            self.draw_dropdown(canvas, text_renderer);
        }
    }

    fn draw_button(&self, canvas: &mut Canvas, text_renderer: &mut dyn TextRenderer) {
        let background = if self.button_pressed {
            BUTTON_PRESSED_COLOR
        } else if self.button_hovered {
            BUTTON_HOVER_COLOR
        } else {
            BAR_COLOR
        };
        canvas.fill_rect(self.button_rect, background);
        if self.button_hovered || self.button_pressed {
            canvas.stroke_rect(self.button_rect, BUTTON_BORDER_COLOR);
        }

        let color = if self.button_hovered {
            TEXT_HOVER_COLOR
        } else {
            TEXT_COLOR
        };
        text::draw_centered(
            canvas,
            text_renderer,
            "File",
            self.button_rect,
            TextStyle::new(color, SizeClass::Small, self.scale_factor),
        );
    }

    fn draw_dropdown(&self, canvas: &mut Canvas, text_renderer: &mut dyn TextRenderer) {
        let panel = self.dropdown_rect();
        canvas.fill_rect(panel, DROPDOWN_BG_COLOR);
        canvas.stroke_rect(panel, DROPDOWN_BORDER_COLOR);

        let indent = (ITEM_TEXT_INDENT * self.scale_factor) as i32;
        for (i, item) in self.items.iter().enumerate() {
            let enabled = self.is_enabled(item.action);
            if item.hovered && enabled {
                canvas.fill_rect(item.rect, ITEM_HOVER_COLOR);
            }
            if i > 0 {
                canvas.draw_line(
                    item.rect.x,
                    item.rect.y,
                    item.rect.right(),
                    item.rect.y,
                    DROPDOWN_BORDER_COLOR,
                );
            }

            let color = match (enabled, item.hovered) {
                (false, _) => TEXT_DISABLED_COLOR,
                (true, true) => TEXT_HOVER_COLOR,
                (true, false) => TEXT_COLOR,
            };
            let style = TextStyle::new(color, SizeClass::Small, self.scale_factor);
            let (_, text_height) =
                text_renderer.measure(item.action.label(), style.size, style.scale);
            let text_y = item.rect.y + (item.rect.h - text_height as i32) / 2;
            text::draw_at(
                canvas,
                text_renderer,
                item.action.label(),
                item.rect.x + indent,
                text_y,
                style,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::tests::{poll_until_done, ScriptedPicker};
    use crate::text::tests::BlockText;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn press(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerPress {
            x,
            y,
            button: PointerButton::Left,
        }
    }

    fn release(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerRelease {
            x,
            y,
            button: PointerButton::Left,
        }
    }

    /// Center of the dropdown row for `action` at scale 1.0
    fn row(action: MenuAction) -> (f64, f64) {
        let idx = MenuAction::ALL.iter().position(|&a| a == action).unwrap();
        (50.0, 35.0 + 25.0 * idx as f64 + 12.0)
    }

    fn click(menu: &mut MenuController, (x, y): (f64, f64)) {
        menu.handle_pointer_event(&press(x, y));
        menu.handle_pointer_event(&release(x, y));
    }

    const BUTTON: (f64, f64) = (20.0, 10.0);

    fn menu_with(picker: ScriptedPicker) -> (MenuController, Arc<ScriptedPicker>, Rc<RefCell<Vec<PathBuf>>>) {
        let picker = Arc::new(picker);
        let mut menu = MenuController::new(picker.clone(), PickMode::Blocking);
        let opened = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&opened);
        menu.set_open_file_callback(move |path| sink.borrow_mut().push(path.to_path_buf()));
        (menu, picker, opened)
    }

    #[test]
    fn button_toggles_the_dropdown() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        assert_eq!(menu.state(), DropdownState::Closed);
        click(&mut menu, BUTTON);
        assert_eq!(menu.state(), DropdownState::Open);
        click(&mut menu, BUTTON);
        assert_eq!(menu.state(), DropdownState::Closed);
    }

    #[test]
    fn outside_click_closes_without_callbacks() {
        let (mut menu, picker, opened) = menu_with(ScriptedPicker::file("/a.png"));
        click(&mut menu, BUTTON);
        click(&mut menu, (400.0, 400.0));
        assert!(!menu.is_open());
        assert!(opened.borrow().is_empty());
        assert_eq!(picker.call_count(), 0);
    }

    #[test]
    fn outside_click_while_closed_does_nothing() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        click(&mut menu, row(MenuAction::OpenFile));
        assert!(!menu.is_open());
    }

    #[test]
    fn cancelled_pick_closes_and_fires_nothing() {
        let (mut menu, picker, opened) = menu_with(ScriptedPicker::default());
        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenFile));
        assert!(!menu.is_open());
        assert!(opened.borrow().is_empty());
        assert_eq!(picker.call_count(), 1);
    }

    #[test]
    fn open_file_fires_the_file_callback_once() {
        let (mut menu, _, opened) = menu_with(ScriptedPicker::file("/pics/cat.png"));
        click(&mut menu, BUTTON);

        // The item acts on press; the release adds nothing
        let (x, y) = row(MenuAction::OpenFile);
        menu.handle_pointer_event(&press(x, y));
        assert!(!menu.is_open());
        assert_eq!(*opened.borrow(), vec![PathBuf::from("/pics/cat.png")]);

        menu.handle_pointer_event(&release(x, y));
        assert_eq!(opened.borrow().len(), 1);
    }

    #[test]
    fn open_folder_fires_the_folder_callback() {
        let (mut menu, _, files) = menu_with(ScriptedPicker::folder("/pics"));
        let folders = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&folders);
        menu.set_open_folder_callback(move |path| sink.borrow_mut().push(path.to_path_buf()));

        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenFolder));
        assert_eq!(*folders.borrow(), vec![PathBuf::from("/pics")]);
        assert!(files.borrow().is_empty());
    }

    #[test]
    fn archive_entry_is_a_placeholder() {
        let (mut menu, picker, opened) = menu_with(ScriptedPicker::file("/a.png"));
        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenArchive));
        assert!(!menu.is_open());
        assert_eq!(picker.call_count(), 0);
        assert!(opened.borrow().is_empty());
    }

    #[test]
    fn registering_a_callback_replaces_the_previous_one() {
        let (mut menu, _, first) = menu_with(ScriptedPicker::file("/a.png"));
        let second = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&second);
        menu.set_open_file_callback(move |_| *counter.borrow_mut() += 1);

        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenFile));
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), 1);
    }

    #[test]
    fn item_hover_only_tracks_while_open() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        let (x, y) = row(MenuAction::OpenFolder);
        menu.handle_pointer_event(&InputEvent::PointerMove { x, y });
        assert!(menu.items.iter().all(|item| !item.hovered));

        click(&mut menu, BUTTON);
        menu.handle_pointer_event(&InputEvent::PointerMove { x, y });
        assert!(menu.items[1].hovered);
        assert!(!menu.items[0].hovered);

        menu.handle_pointer_event(&InputEvent::PointerMove {
            x: BUTTON.0,
            y: BUTTON.1,
        });
        assert!(menu.button_hovered);
        assert!(!menu.items[1].hovered);
    }

    #[test]
    fn pressed_flag_follows_the_left_button() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        menu.handle_pointer_event(&press(BUTTON.0, BUTTON.1));
        assert!(menu.button_pressed);
        menu.handle_pointer_event(&release(300.0, 300.0));
        assert!(!menu.button_pressed);
    }

    #[test]
    fn right_clicks_are_ignored() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        menu.handle_pointer_event(&InputEvent::PointerPress {
            x: BUTTON.0,
            y: BUTTON.1,
            button: PointerButton::Right,
        });
        assert!(!menu.is_open());
    }

    #[test]
    fn scale_changes_every_dimension() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        assert_eq!(menu.height(), 35);

        menu.set_scale(2.0);
        menu.relayout(1600, 1200);
        assert_eq!(menu.height(), 70);
        assert_eq!(menu.button_rect, Rect::new(5, 0, 120, 70));
        assert_eq!(menu.items[2].rect, Rect::new(5, 70 + 2 * 50, 300, 50));
        assert_eq!(menu.dropdown_rect(), Rect::new(5, 70, 300, 150));
    }

    #[test]
    fn background_pick_disables_open_items_until_resolved() {
        let picker = Arc::new(ScriptedPicker::file("/slow.png"));
        let mut menu = MenuController::new(picker.clone(), PickMode::Background);
        let opened = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&opened);
        menu.set_open_file_callback(move |path| sink.borrow_mut().push(path.to_path_buf()));

        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenFile));
        assert!(!menu.is_open());
        assert!(menu.is_pick_pending());
        assert!(!menu.is_enabled(MenuAction::OpenFile));
        assert!(!menu.is_enabled(MenuAction::OpenFolder));
        assert!(menu.is_enabled(MenuAction::OpenArchive));

        // A second request while pending only closes the dropdown
        click(&mut menu, BUTTON);
        click(&mut menu, row(MenuAction::OpenFolder));
        assert!(!menu.is_open());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !menu.poll_pending() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!menu.is_pick_pending());
        assert_eq!(*opened.borrow(), vec![PathBuf::from("/slow.png")]);
        assert_eq!(picker.call_count(), 1);
        assert!(!menu.poll_pending());
    }

    #[test]
    fn poll_helper_sees_background_results() {
        let picker: Arc<dyn FilePicker> = Arc::new(ScriptedPicker::folder("/x"));
        let pending = PendingPick::spawn(picker, PickKind::Folder);
        assert_eq!(poll_until_done(&pending), Some(Some(PathBuf::from("/x"))));
    }

    #[test]
    fn render_draws_the_dropdown_only_when_open() {
        let (mut menu, _, _) = menu_with(ScriptedPicker::default());
        let mut text = BlockText::default();
        let mut canvas = Canvas::new(800, 600);
        let probe = (140, 100);

        canvas.clear(Color::rgb(0x20, 0x20, 0x20));
        menu.render(&mut canvas, &mut text);
        assert_eq!(canvas.pixel(400, 10), Some(BAR_COLOR));
        assert_eq!(canvas.pixel(400, 34), Some(BAR_SEPARATOR_COLOR));
        assert_eq!(canvas.pixel(probe.0, probe.1), Some(Color::rgb(0x20, 0x20, 0x20)));
        assert_eq!(text.rendered, vec!["File".to_string()]);

        click(&mut menu, BUTTON);
        canvas.clear(Color::rgb(0x20, 0x20, 0x20));
        text.rendered.clear();
        menu.render(&mut canvas, &mut text);
        assert_eq!(canvas.pixel(probe.0, probe.1), Some(DROPDOWN_BG_COLOR));
        assert_eq!(
            text.rendered,
            vec!["File", "Open File", "Open Folder", "Open Archive"]
        );
    }
}
