use crate::about;
use crate::controller::{LocationProvider, MapDisplay, OverrideController};
use crate::location::{Coordinate, LocationEvent, SavedLocation};
use crate::state::{Dialog, State};
use crate::store::KeyValueSlots;
use crate::{VirtualLocationApp, INITIAL_WIDTH, PROGRAM_TITLE};
use eframe::egui::{self, Align2, Color32, Context, FontId, Sense, Stroke, Ui};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

const MAP_BACKGROUND: Color32 = Color32::from_rgb(232, 236, 228);
const GRID_COLOR: Color32 = Color32::from_rgb(205, 210, 200);
const PIN_COLOR: Color32 = Color32::from_rgb(220, 40, 40);
const LIVE_COLOR: Color32 = Color32::from_rgb(30, 120, 255);
const METERS_PER_DEGREE: f64 = 111_320.0;
const CJK_FONT_NAME: &str = "cjk";

// Where common desktop systems keep a font with Chinese glyphs
const CJK_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

/// Returns the first readable font file, trying `configured` before the
/// built-in system locations.
pub fn find_cjk_font(configured: Option<&Path>, candidates: &[&str]) -> Option<(PathBuf, Vec<u8>)> {
    let paths = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(candidates.iter().map(PathBuf::from));
    for path in paths {
        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => return Some((path, bytes)),
            Ok(_) => log::debug!("Font file {} is empty, skipping.", path.display()),
            Err(e) => log::trace!("No font at {}: {}", path.display(), e),
        }
    }
    None
}

/// Adds a CJK font as fallback to both font families so the Chinese labels
/// render. Keeps egui's defaults when no such font is found.
pub fn install_cjk_font(ctx: &Context, configured: Option<&Path>) -> bool {
    install_cjk_font_from(ctx, configured, CJK_FONT_CANDIDATES)
}

fn install_cjk_font_from(ctx: &Context, configured: Option<&Path>, candidates: &[&str]) -> bool {
    let Some((path, bytes)) = find_cjk_font(configured, candidates) else {
        log::warn!("No CJK font found, Chinese text will not render. Set cjk_font_path in the config.");
        return false;
    };

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert(CJK_FONT_NAME.to_owned(), egui::FontData::from_owned(bytes).into());
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts
            .families
            .entry(family)
            .or_default()
            .push(CJK_FONT_NAME.to_owned());
    }
    ctx.set_fonts(fonts);
    log::info!("Loaded CJK font from {}", path.display());
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub title: String,
    pub subtitle: String,
}

/// The on-screen map: a region around a center point, at most one marker and
/// the coordinate readout underneath.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPanel {
    pub center: Option<Coordinate>,
    pub span_meters: f64,
    pub marker: Option<Marker>,
    pub readout: String,
}

impl Default for MapPanel {
    fn default() -> Self {
        Self {
            center: None,
            span_meters: crate::controller::DEFAULT_SPAN_METERS,
            marker: None,
            readout: String::new(),
        }
    }
}

impl MapDisplay for MapPanel {
    fn set_visible_region(&mut self, center: Coordinate, span_meters: f64) {
        self.center = Some(center);
        self.span_meters = span_meters;
    }

    fn set_single_marker(&mut self, coordinate: Coordinate, title: String, subtitle: String) {
        self.marker = Some(Marker {
            coordinate,
            title,
            subtitle,
        });
    }

    fn set_readout_text(&mut self, text: String) {
        self.readout = text;
    }
}

impl MapPanel {
    /// Offset of `point` from the region center in screen units, for a map
    /// `width` units wide showing `span_meters`. North is up.
    pub fn screen_offset(&self, point: Coordinate, width: f32) -> Option<egui::Vec2> {
        let center = self.center?;
        if self.span_meters <= 0.0 {
            return None;
        }
        let north_m = (point.latitude - center.latitude) * METERS_PER_DEGREE;
        let east_m = (point.longitude - center.longitude)
            * METERS_PER_DEGREE
            * center.latitude.to_radians().cos();
        let scale = f64::from(width) / self.span_meters;
        Some(egui::vec2((east_m * scale) as f32, (-north_m * scale) as f32))
    }

    fn draw(&self, ui: &mut Ui, size: egui::Vec2) {
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, MAP_BACKGROUND);

        let grid = Stroke::new(1.0, GRID_COLOR);
        for i in 1..8 {
            let x = rect.left() + rect.width() * i as f32 / 8.0;
            let y = rect.top() + rect.height() * i as f32 / 8.0;
            painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], grid);
            painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], grid);
        }

        let Some(center) = self.center else {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No location yet",
                FontId::proportional(16.0),
                Color32::DARK_GRAY,
            );
            return;
        };

        if let Some(marker) = &self.marker {
            if let Some(offset) = self.screen_offset(marker.coordinate, rect.width()) {
                let pin = rect.center() + offset;
                if rect.contains(pin) {
                    painter.circle_filled(pin, 7.0, PIN_COLOR);
                    painter.text(
                        pin + egui::vec2(0.0, -12.0),
                        Align2::CENTER_BOTTOM,
                        &marker.title,
                        FontId::proportional(14.0),
                        Color32::BLACK,
                    );
                    painter.text(
                        pin + egui::vec2(0.0, 10.0),
                        Align2::CENTER_TOP,
                        &marker.subtitle,
                        FontId::proportional(12.0),
                        Color32::DARK_GRAY,
                    );
                }
            }
        }

        // Live position dot stays at the center while no override is drawn there
        if self.marker.as_ref().map(|m| m.coordinate) != Some(center) {
            painter.circle_filled(rect.center(), 6.0, LIVE_COLOR);
        }

        painter.text(
            rect.left_bottom() + egui::vec2(8.0, -8.0),
            Align2::LEFT_BOTTOM,
            format!("{} | {:.0} m", center, self.span_meters),
            FontId::monospace(11.0),
            Color32::DARK_GRAY,
        );
    }
}

/// Everything the single screen shows, minus the window chrome.
pub struct Screen<P: LocationProvider, S: KeyValueSlots> {
    pub controller: OverrideController<MapPanel, P, S>,
    pub dialog: Dialog,
}

// What a click inside a dialog asked for, applied after the window closes
enum DialogAction {
    None,
    Confirm,
    Choose(SavedLocation),
    Close,
}

impl<P: LocationProvider, S: KeyValueSlots> Screen<P, S> {
    pub fn new(controller: OverrideController<MapPanel, P, S>) -> Self {
        Self {
            controller,
            dialog: Dialog::None,
        }
    }

    /// Applies every event waiting on the update channel, in order.
    pub fn drain_events(&mut self, events: &Receiver<LocationEvent>) -> usize {
        let mut count = 0;
        for event in events.try_iter() {
            self.controller.handle_event(event);
            count += 1;
        }
        if count > 0 {
            log::trace!("Applied {} location events.", count);
        }
        count
    }

    pub fn open_coordinate_prompt(&mut self) {
        self.dialog = Dialog::coordinate_prompt();
    }

    /// Confirms the coordinate prompt. Malformed input closes it silently.
    pub fn confirm_coordinate_prompt(&mut self) {
        let Dialog::CoordinatePrompt { latitude, longitude } = &self.dialog else {
            return;
        };
        match self
            .controller
            .set_virtual_location_from_input(latitude, longitude)
        {
            Ok(_) => self.show_success(),
            Err(e) => {
                log::debug!("Coordinate prompt dismissed: {}", e);
                self.dialog = Dialog::None;
            }
        }
    }

    pub fn show_current_location(&mut self) {
        self.controller.show_current_location();
        self.dialog = Dialog::Message {
            title: "提示",
            body: "已切换到当前位置",
        };
    }

    pub fn open_saved_locations(&mut self) {
        self.dialog = Dialog::SavedLocations(self.controller.saved_locations());
    }

    /// Applies the record picked in the saved-locations dialog.
    pub fn choose_saved_location(&mut self, location: &SavedLocation) {
        self.controller.select_saved_location(location);
        self.show_success();
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    fn show_success(&mut self) {
        self.dialog = Dialog::Message {
            title: "成功",
            body: "虚拟位置已设置",
        };
    }

    pub fn map(&self) -> &MapPanel {
        self.controller.display()
    }

    fn draw_dialog(&mut self, ctx: &Context) {
        let title = match &self.dialog {
            Dialog::None => return,
            Dialog::CoordinatePrompt { .. } => "设置虚拟位置",
            Dialog::SavedLocations(_) => "保存的位置",
            Dialog::Message { title, .. } => *title,
        };

        let mut action = DialogAction::None;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| match &mut self.dialog {
                Dialog::None => {}
                Dialog::CoordinatePrompt { latitude, longitude } => {
                    ui.label("请输入经纬度坐标");
                    ui.add(egui::TextEdit::singleline(latitude).hint_text("纬度 (例如: 39.9042)"));
                    ui.add(egui::TextEdit::singleline(longitude).hint_text("经度 (例如: 116.4074)"));
                    ui.horizontal(|ui| {
                        if ui.button("确定").clicked() {
                            action = DialogAction::Confirm;
                        }
                        if ui.button("取消").clicked() {
                            action = DialogAction::Close;
                        }
                    });
                }
                Dialog::SavedLocations(locations) => {
                    egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                        for location in locations.iter() {
                            if ui
                                .button(location.to_string())
                                .on_hover_text(location.coordinate().to_string())
                                .clicked()
                            {
                                action = DialogAction::Choose(location.clone());
                            }
                        }
                    });
                    ui.separator();
                    if ui.button("取消").clicked() {
                        action = DialogAction::Close;
                    }
                }
                Dialog::Message { body, .. } => {
                    ui.label(*body);
                    if ui.button("确定").clicked() {
                        action = DialogAction::Close;
                    }
                }
            });

        match action {
            DialogAction::None => {}
            DialogAction::Confirm => self.confirm_coordinate_prompt(),
            DialogAction::Choose(location) => self.choose_saved_location(&location),
            DialogAction::Close => self.close_dialog(),
        }
    }
}

// --- UI Drawing Functions ---

pub(crate) fn draw_about_screen(app: &mut VirtualLocationApp, ui: &mut Ui) {
    ui.set_width(INITIAL_WIDTH);
    ui.vertical_centered(|ui| {
        ui.heading(format!("About {}", PROGRAM_TITLE));
        ui.separator();
        for line in about::about() {
            ui.label(line);
        }
        ui.separator();
        if ui.button("OK").clicked() {
            app.state = State::Running;
        }
    });
}

pub(crate) fn draw_running_state<P: LocationProvider, S: KeyValueSlots>(
    screen: &mut Screen<P, S>,
    ui: &mut Ui,
    ctx: &Context,
) -> bool {
    let mut about_clicked = false;
    let modal_open = screen.dialog.is_open();

    let map_height = (ui.available_height() - 90.0).max(120.0);
    let map_size = egui::vec2(ui.available_width(), map_height);
    screen.map().draw(ui, map_size);

    ui.add_space(6.0);
    ui.vertical_centered(|ui| {
        ui.label(egui::RichText::new(&screen.map().readout).size(14.0));
    });
    ui.add_space(6.0);

    ui.add_enabled_ui(!modal_open, |ui| {
        ui.horizontal(|ui| {
            if ui.button("设置虚拟位置").clicked() {
                screen.open_coordinate_prompt();
            }
            if ui.button("当前位置").clicked() {
                screen.show_current_location();
            }
            if ui.button("保存的位置").clicked() {
                screen.open_saved_locations();
            }
            ui.separator();
            if ui.button("About").clicked() {
                about_clicked = true;
            }
        });
    });

    screen.draw_dialog(ctx);
    about_clicked
}
