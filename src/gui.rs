// src/gui.rs
use eframe::egui;
use egui::{Color32, Pos2, Rect, Rounding, Stroke, Vec2};
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::{error, info};
use crate::engine::BlinkEngine;
use crate::game::{self, FrameInput, PongGame};
use crate::signal::StopSignal;
use crate::types::InputMode;
/// Catch-up limit so a stalled frame doesn't fast-forward the game.
const MAX_STEPS_PER_FRAME: u32 = 4;
pub struct BlinkPongApp {
    engine: BlinkEngine,
    game: PongGame,
    accumulator: f64,
    pending_blink: bool,
    blink_count: u64,
    log_messages: Vec<String>,
    stop: StopSignal,
    stopped: bool,
}
impl BlinkPongApp {
    /// `stop` is polled every frame; raising it (Ctrl-C) ends the session.
    pub fn new(engine: BlinkEngine, npc: bool, stop: StopSignal) -> Self {
        let mode = engine.mode();
        let mut app = Self {
            engine,
            game: PongGame::new(npc),
            accumulator: 0.0,
            pending_blink: false,
            blink_count: 0,
            log_messages: Vec::new(),
            stop,
            stopped: false,
        };
        app.log(&format!("{} mode ready.", mode.label()));
        if mode == InputMode::Simulation {
            app.log("Press SPACE to blink.");
        }
        app
    }
    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }
    /// Releases the engine once the stop signal is raised; true only on that frame.
    fn handle_stop_request(&mut self) -> bool {
        if !self.stopped && self.stop.is_triggered() {
            info!("interrupted, shutting down {} session", self.engine.mode().label());
            self.log("Interrupted.");
            self.engine.shutdown();
            self.stopped = true;
            return true;
        }
        false
    }
    fn poll_input(&mut self, ctx: &egui::Context) {
        match self.engine.poll_frame() {
            Ok(report) => {
                if report.blink {
                    self.pending_blink = true;
                    self.blink_count += 1;
                    self.log(&format!("Blink #{}", self.blink_count));
                }
            }
            Err(err) => {
                error!("stopping game: {err}");
                self.log(&format!("Stopped: {err}"));
                self.engine.shutdown();
                self.stopped = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
        if self.engine.mode() == InputMode::Simulation
            && ctx.input(|i| i.key_pressed(egui::Key::Space))
        {
            self.pending_blink = true;
            self.blink_count += 1;
        }
    }
    fn advance_game(&mut self, ctx: &egui::Context) {
        let (dt, right_up, right_down) = ctx.input(|i| {
            (
                f64::from(i.stable_dt),
                i.key_down(egui::Key::ArrowUp),
                i.key_down(egui::Key::ArrowDown),
            )
        });
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= game::STEP_SECONDS && steps < MAX_STEPS_PER_FRAME {
            let input = FrameInput {
                // A blink is consumed by the first step only.
                blink: std::mem::take(&mut self.pending_blink),
                right_up,
                right_down,
            };
            self.game.step(&input);
            self.accumulator -= game::STEP_SECONDS;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_FRAME {
            self.accumulator = 0.0;
        }
    }
    fn draw_field(&self, ui: &mut egui::Ui) {
        let size = Vec2::new(game::FIELD_WIDTH, game::FIELD_HEIGHT);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let origin = response.rect.min;
        let to_screen = |x: f32, y: f32, w: f32, h: f32| {
            Rect::from_min_size(origin + Vec2::new(x, y), Vec2::new(w, h))
        };
        painter.rect_filled(response.rect, Rounding::same(0.0), Color32::BLACK);
        painter.rect_stroke(
            response.rect,
            Rounding::same(0.0),
            Stroke::new(1.0, Color32::from_rgb(60, 60, 60)),
        );
        let mid = game::FIELD_WIDTH / 2.0;
        let mut y = 0.0;
        while y < game::FIELD_HEIGHT {
            painter.rect_filled(to_screen(mid - 2.0, y, 4.0, 10.0), Rounding::same(0.0), Color32::GRAY);
            y += 20.0;
        }
        for paddle in [&self.game.left, &self.game.right] {
            painter.rect_filled(
                to_screen(paddle.x, paddle.y, game::PADDLE_WIDTH, game::PADDLE_HEIGHT),
                Rounding::same(0.0),
                Color32::WHITE,
            );
        }
        let ball = &self.game.ball;
        painter.rect_filled(
            to_screen(ball.x, ball.y, game::BALL_SIZE, game::BALL_SIZE),
            Rounding::same(0.0),
            Color32::from_rgb(0, 255, 255),
        );
        painter.text(
            Pos2::new(origin.x + mid, origin.y + 12.0),
            egui::Align2::CENTER_TOP,
            format!("{}   {}", self.game.score_left, self.game.score_right),
            egui::FontId::monospace(24.0),
            Color32::WHITE,
        );
    }
    fn draw_detector_panel(&self, ui: &mut egui::Ui) {
        ui.heading("BlinkPong");
        ui.label(format!("Input: {}", self.engine.mode().label()));
        ui.label(format!("Blinks: {}", self.blink_count));
        if self.game.is_npc() {
            ui.label("Right paddle: NPC");
        } else {
            ui.label("Right paddle: UP / DOWN");
        }
        ui.separator();
        if let Some(pipeline) = self.engine.pipeline() {
            let detector = pipeline.detector();
            ui.label(format!("Alpha avg: {:.1}", detector.alpha_average()));
            ui.label(format!("Threshold: {:.1}", detector.alpha_threshold()));
            ui.label(format!(
                "Delta avg: {:.1} / {:.1}",
                detector.delta_average(),
                detector.delta_threshold()
            ));
            let buffer = pipeline.buffer();
            ui.label(format!(
                "Window: {}/{} samples, {} ch @ {:.0} Hz",
                buffer.len(),
                buffer.capacity(),
                buffer.channels().unwrap_or(0),
                pipeline.sample_rate_hz()
            ));
            ui.label(format!("Phase: {:?}", detector.phase()));
            let (avg, thr): (Vec<[f64; 2]>, Vec<[f64; 2]>) = self
                .engine
                .history()
                .map(|s| ([s.time_secs, s.alpha_average], [s.time_secs, s.alpha_threshold]))
                .unzip();
            Plot::new("alpha_plot")
                .height(220.0)
                .legend(Legend::default())
                .include_y(0.0)
                .auto_bounds_x()
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new(PlotPoints::new(avg))
                            .name("alpha avg")
                            .color(Color32::from_rgb(0, 255, 255)),
                    );
                    plot_ui.line(
                        Line::new(PlotPoints::new(thr))
                            .name("threshold")
                            .color(Color32::YELLOW),
                    );
                });
        } else {
            ui.label(egui::RichText::new("No EEG in simulation mode").color(Color32::YELLOW).small());
        }
        ui.add_space(10.0);
        egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });
    }
}
impl eframe::App for BlinkPongApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.handle_stop_request() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if !self.stopped {
            self.poll_input(ctx);
            self.advance_game(ctx);
        }
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);
        egui::SidePanel::left("detector").min_width(280.0).show(ctx, |ui| {
            self.draw_detector_panel(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_field(ui);
        });
        ctx.request_repaint();
    }
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.engine.shutdown();
    }
}
