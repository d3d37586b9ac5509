use crate::background::Background;
use crate::completion::CompletionClient;
use crate::event::AppEvent;
use crate::markdown;
use crate::session::history::MessageStore;
use crate::session::saved::SessionManager;
use crate::session::{Message, Sender, SessionId};
use crate::state::AppState;
use crate::theme::{Theme, ThemeName};
use crate::transcript::ReplyCache;
use chrono::{DateTime, Local, Utc};
use eframe::egui::{self, Align, Color32, Layout, RichText, ScrollArea, TextureHandle, TextureOptions};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;
use tracing::{info, warn};

const MAX_DIAGNOSTICS: usize = 200;
const BUBBLE_WIDTH_RATIO: f32 = 0.7;

pub struct ChatApp {
    rx: Receiver<AppEvent>,
    client: CompletionClient,
    history: MessageStore,
    replies: ReplyCache,
    saved: SessionManager,
    state: AppState,
    theme: Theme,
    visuals_dirty: bool,
    input_buffer: String,
    session_title: String,
    loading: bool,
    diagnostics_log: Vec<String>,
    background_texture: Option<TextureHandle>,
    background_dirty: bool,
    scroll_to_bottom: bool,
    focus_input: bool,
}

enum SidebarAction {
    Save(String),
    Load(SessionId),
    Delete(SessionId),
    PickBackground,
    ClearBackground,
}

impl ChatApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        client: CompletionClient,
        history: MessageStore,
        saved: SessionManager,
        state: AppState,
    ) -> Self {
        let theme = Theme::for_name(state.theme());
        let replies = ReplyCache::build(history.messages());
        Self {
            rx,
            client,
            history,
            replies,
            saved,
            state,
            theme,
            visuals_dirty: true,
            input_buffer: String::new(),
            session_title: String::new(),
            loading: false,
            diagnostics_log: Vec::new(),
            background_texture: None,
            background_dirty: true,
            scroll_to_bottom: true,
            focus_input: true,
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.diagnostics_log
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
        if self.diagnostics_log.len() > MAX_DIAGNOSTICS {
            self.diagnostics_log.remove(0);
        }
    }

    fn report<E: std::fmt::Display>(&mut self, context: &str, result: Result<(), E>) {
        if let Err(err) = result {
            self.log_diagnostic(format!("{context}: {err}"));
        }
    }

    fn format_time(time: Option<DateTime<Utc>>) -> String {
        time.map(|time| time.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_default()
    }

    fn submit_prompt(&mut self) {
        if self.loading || self.input_buffer.trim().is_empty() {
            return;
        }

        let text = std::mem::take(&mut self.input_buffer);
        let message = Message::user(text.clone());
        self.replies.push(&message);
        let result = self.history.append(message);
        self.report("failed to persist chat history", result);

        self.client.send(text);
        self.loading = true;
        self.scroll_to_bottom = true;
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    self.loading = false;
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CompletionFinished(outcome) => {
                let message = outcome.into_message();
                if message.is_error() {
                    self.log_diagnostic(format!("completion failed: {}", message.text()));
                }
                self.replies.push(&message);
                let result = self.history.append(message);
                self.report("failed to persist chat history", result);
                self.loading = false;
                self.scroll_to_bottom = true;
                self.focus_input = true;
            }
        }
    }

    fn clear_chat(&mut self) {
        let result = self.history.clear();
        self.replies.clear();
        self.report("failed to persist chat history", result);
    }

    fn select_theme(&mut self, name: ThemeName) {
        if name == self.state.theme() {
            return;
        }
        let result = self.state.set_theme(name);
        self.report("failed to persist theme", result);
        self.theme = Theme::for_name(name);
        self.visuals_dirty = true;
    }

    fn apply_sidebar_action(&mut self, action: SidebarAction) {
        match action {
            SidebarAction::Save(title) => {
                match self.saved.save(title.clone(), self.history.messages()) {
                    Ok(id) => {
                        info!(%id, %title, "saved chat");
                        self.session_title.clear();
                    }
                    Err(err) => self.log_diagnostic(format!("failed to save chat: {err}")),
                }
            }
            SidebarAction::Load(id) => match self.saved.load(id) {
                Some(messages) => {
                    let result = self.history.replace(messages);
                    self.replies.rebuild(self.history.messages());
                    self.report("failed to persist chat history", result);
                    self.scroll_to_bottom = true;
                }
                None => self.log_diagnostic(format!("saved chat {id} no longer exists")),
            },
            SidebarAction::Delete(id) => {
                let result = self.saved.delete(id).map(|_| ());
                self.report("failed to delete saved chat", result);
            }
            SidebarAction::PickBackground => {
                if let Some(path) = Self::pick_image() {
                    self.load_background(path);
                }
            }
            SidebarAction::ClearBackground => {
                let result = self.state.clear_background();
                self.report("failed to clear background", result);
                self.background_dirty = true;
            }
        }
    }

    fn pick_image() -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
            .pick_file()
    }

    fn load_background(&mut self, path: PathBuf) {
        match Background::from_file(&path) {
            Ok(background) => {
                let result = self.state.set_background(background);
                self.report("failed to persist background", result);
                self.background_dirty = true;
            }
            Err(err) => self.log_diagnostic(format!("background not loaded: {err}")),
        }
    }

    fn refresh_background_texture(&mut self, ctx: &egui::Context) {
        if !self.background_dirty {
            return;
        }
        self.background_dirty = false;
        self.background_texture = None;

        let Some(background) = self.state.background() else {
            return;
        };
        match background.decode() {
            Ok(image) => {
                let size = [image.width() as usize, image.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
                self.background_texture =
                    Some(ctx.load_texture("chat_background", color_image, TextureOptions::LINEAR));
            }
            Err(err) => self.log_diagnostic(format!("stored background is unreadable: {err}")),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut selected_theme = self.state.theme();
        let mut toggle_sidebar = false;
        let mut clear = false;

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::new()
                    .fill(self.theme.header)
                    .inner_margin(egui::Margin::same(12)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    toggle_sidebar = ui.button("☰").on_hover_text("Saved chats").clicked();
                    clear = ui.button("Clear").clicked();
                    ui.separator();
                    ui.label(
                        RichText::new("Chatbot UI")
                            .heading()
                            .color(self.theme.text_on_accent),
                    );
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        egui::ComboBox::from_id_salt("theme_select")
                            .selected_text(selected_theme.label())
                            .show_ui(ui, |ui| {
                                for name in ThemeName::ALL {
                                    ui.selectable_value(&mut selected_theme, name, name.label());
                                }
                            });
                        ui.label(RichText::new("Theme").color(self.theme.text_on_accent));
                    });
                });
            });

        if toggle_sidebar {
            self.state.toggle_sidebar();
        }
        if clear {
            self.clear_chat();
        }
        self.select_theme(selected_theme);
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        if !self.state.sidebar_open() {
            return;
        }

        let mut action = None;
        egui::SidePanel::left("saved_chats")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Saved Chats");
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.session_title)
                            .desired_width(150.0)
                            .hint_text("Chat name"),
                    );
                    let title = self.session_title.trim();
                    if ui
                        .add_enabled(!title.is_empty(), egui::Button::new("Save"))
                        .clicked()
                    {
                        action = Some(SidebarAction::Save(title.to_string()));
                    }
                });
                ui.separator();

                let sessions = self.saved.list();
                if sessions.is_empty() {
                    ui.label(RichText::new("No saved chats yet").color(self.theme.text_muted));
                }
                ScrollArea::vertical()
                    .id_salt("saved_chat_list")
                    .max_height((ui.available_height() - 120.0).max(80.0))
                    .show(ui, |ui| {
                        for session in &sessions {
                            ui.horizontal(|ui| {
                                let label = format!("{} ({})", session.title, session.message_count);
                                let load = ui.button(label);
                                let load = match session.created_at {
                                    Some(created) => load.on_hover_text(
                                        created.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                                    ),
                                    None => load,
                                };
                                if load.clicked() {
                                    action = Some(SidebarAction::Load(session.id));
                                }
                                if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                                    action = Some(SidebarAction::Delete(session.id));
                                }
                            });
                        }
                    });

                ui.separator();
                ui.strong("Background");
                ui.horizontal(|ui| {
                    if ui.button("Choose image…").clicked() {
                        action = Some(SidebarAction::PickBackground);
                    }
                    if ui
                        .add_enabled(self.state.background().is_some(), egui::Button::new("Remove"))
                        .clicked()
                    {
                        action = Some(SidebarAction::ClearBackground);
                    }
                });
            });

        if let Some(action) = action {
            self.apply_sidebar_action(action);
        }
    }

    fn render_bot_body(&self, ui: &mut egui::Ui, index: usize, message: &Message) {
        if message.is_error() {
            ui.label(RichText::new(message.text()).color(self.theme.danger));
            return;
        }

        let Some(reply) = self.replies.get(index) else {
            ui.label(RichText::new(message.text()).color(self.theme.text_primary));
            return;
        };
        markdown::show(ui, &reply.answer, &self.theme);
        if let Some(reasoning) = &reply.reasoning {
            egui::CollapsingHeader::new(RichText::new("Show Thinking").color(self.theme.accent_primary))
                .id_salt(("thinking", index))
                .default_open(false)
                .show(ui, |ui| {
                    self.theme.code_frame().show(ui, |ui| {
                        ui.label(
                            RichText::new(reasoning.as_str())
                                .monospace()
                                .color(Color32::from_rgb(0xEE, 0xEE, 0xEE)),
                        );
                    });
                });
        }
    }

    fn render_message(&self, ui: &mut egui::Ui, index: usize, message: &Message) {
        let is_user = message.sender() == Sender::User;
        let fill = if is_user {
            self.theme.user_bubble
        } else {
            self.theme.bot_bubble
        };
        let layout = if is_user {
            Layout::right_to_left(Align::TOP)
        } else {
            Layout::left_to_right(Align::TOP)
        };
        let max_width = ui.available_width() * BUBBLE_WIDTH_RATIO;

        ui.with_layout(layout, |ui| {
            self.theme
                .bubble_frame(fill, message.is_error())
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    ui.with_layout(Layout::top_down(Align::Min), |ui| {
                        if is_user {
                            ui.label(RichText::new(message.text()).color(self.theme.text_on_accent));
                        } else {
                            self.render_bot_body(ui, index, message);
                        }
                        let time_color = if message.is_error() {
                            self.theme.danger
                        } else if is_user {
                            self.theme.text_on_accent
                        } else {
                            self.theme.text_muted
                        };
                        ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                            ui.label(
                                RichText::new(Self::format_time(message.time()))
                                    .small()
                                    .color(time_color),
                            );
                        });
                    });
                });
        });
    }

    fn render_typing_indicator(&self, ui: &mut egui::Ui) {
        let dots = (ui.input(|input| input.time) * 3.0) as usize % 3 + 1;
        ui.with_layout(Layout::left_to_right(Align::TOP), |ui| {
            self.theme
                .bubble_frame(self.theme.bot_bubble, false)
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(format!("Bot is typing{}", ".".repeat(dots)))
                            .italics()
                            .color(self.theme.text_primary),
                    );
                });
        });
    }

    fn render_welcome(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.label(RichText::new("Welcome! 👋").heading().color(self.theme.text_muted));
            ui.label(
                RichText::new("Ask me anything about code, AI, or more.").color(self.theme.text_muted),
            );
        });
    }

    fn render_composer(&mut self, ctx: &egui::Context) {
        let mut send_now = false;
        egui::TopBottomPanel::bottom("composer")
            .frame(self.theme.composer_frame())
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let hint = if self.loading {
                        "Waiting for response..."
                    } else {
                        "Type your message..."
                    };
                    let response = ui.add_enabled(
                        !self.loading,
                        egui::TextEdit::singleline(&mut self.input_buffer)
                            .desired_width(ui.available_width() - 80.0)
                            .hint_text(hint),
                    );
                    if self.focus_input && !self.loading {
                        response.request_focus();
                        self.focus_input = false;
                    }
                    let (enter, modifiers) =
                        ui.input(|input| (input.key_pressed(egui::Key::Enter), input.modifiers));
                    let (send, refocus) = enter_action(response.lost_focus() && enter, modifiers);
                    send_now |= send;
                    self.focus_input |= refocus;

                    send_now |= ui
                        .add_enabled(!self.loading, egui::Button::new("Send"))
                        .clicked();
                });

                egui::CollapsingHeader::new("Diagnostics")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("diagnostics_log")
                            .max_height(90.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for entry in &self.diagnostics_log {
                                    ui.label(RichText::new(entry).small());
                                }
                            });
                    });
            });

        if send_now {
            self.submit_prompt();
        }
    }

    fn render_chat(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(self.theme.app_background)
                    .inner_margin(egui::Margin::same(20)),
            )
            .show(ctx, |ui| {
                if let Some(texture) = &self.background_texture {
                    let rect = ui.max_rect().expand(20.0);
                    ui.painter().image(
                        texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }

                ScrollArea::vertical()
                    .id_salt("chat_transcript")
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if self.history.is_empty() && !self.loading {
                            self.render_welcome(ui);
                        }

                        for (index, message) in self.history.messages().iter().enumerate() {
                            self.render_message(ui, index, message);
                            ui.add_space(7.0);
                        }

                        if self.loading {
                            self.render_typing_indicator(ui);
                        }

                        if self.scroll_to_bottom {
                            ui.scroll_to_cursor(Some(Align::BOTTOM));
                        }
                    });
            });
        self.scroll_to_bottom = false;
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        if !self.replies.matches(self.history.messages()) {
            self.replies.rebuild(self.history.messages());
        }
        if self.visuals_dirty {
            self.theme.apply_visuals(ctx);
            self.visuals_dirty = false;
        }
        self.refresh_background_texture(ctx);

        self.render_top_bar(ctx);
        self.render_sidebar(ctx);
        self.render_composer(ctx);
        self.render_chat(ctx);

        if self.loading {
            ctx.request_repaint_after(Duration::from_millis(150));
        }
    }
}

/// Decides what an Enter press that ended editing does: send unless only
/// Shift is held, and keep the composer focused either way.
fn enter_action(enter_ended_edit: bool, modifiers: egui::Modifiers) -> (bool, bool) {
    if !enter_ended_edit {
        return (false, false);
    }
    (modifiers.ctrl || !modifiers.shift, true)
}

#[cfg(test)]
mod tests {
    use super::enter_action;
    use eframe::egui::Modifiers;

    #[test]
    fn plain_and_ctrl_enter_send_and_keep_focus() {
        assert_eq!(enter_action(true, Modifiers::NONE), (true, true));
        assert_eq!(enter_action(true, Modifiers::CTRL), (true, true));
        assert_eq!(enter_action(true, Modifiers::CTRL | Modifiers::SHIFT), (true, true));
    }

    #[test]
    fn shift_enter_keeps_focus_without_sending() {
        assert_eq!(enter_action(true, Modifiers::SHIFT), (false, true));
    }

    #[test]
    fn focus_loss_without_enter_changes_nothing() {
        assert_eq!(enter_action(false, Modifiers::NONE), (false, false));
        assert_eq!(enter_action(false, Modifiers::SHIFT), (false, false));
    }
}
