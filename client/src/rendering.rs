use crate::model::GameStateModel;
use crate::renderer::Renderer;
use log::{info, warn};
use macroquad::prelude::*;
use macroquad::window::Conf;
use protocol::{Coordinates, Explosions, PlayerInfo, NEUTRAL_COLOR};

const SQRT_3: f32 = 1.732_050_8;
const HUD_WIDTH: f32 = 220.0;
const MARGIN: f32 = 20.0;

/// Pixel geometry of a pointy-top axial hex grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexLayout {
    pub size: f32,
    pub origin: Vec2,
}

impl HexLayout {
    /// Fits every coordinate in a `width` x `height` area.
    pub fn fit<'a>(coords: impl IntoIterator<Item = &'a Coordinates>, width: f32, height: f32) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut any = false;

        for coord in coords {
            let unit = axial_to_cartesian(*coord, 1.0);
            min = min.min(unit);
            max = max.max(unit);
            any = true;
        }

        if !any {
            return Self {
                size: 1.0,
                origin: vec2(width / 2.0, height / 2.0),
            };
        }

        // One extra hex radius on each side so border cells are not clipped.
        let span = (max - min) + vec2(SQRT_3, 2.0);
        let size = (width / span.x).min(height / span.y).max(1.0);
        let center = (min + max) / 2.0 * size;

        Self {
            size,
            origin: vec2(width / 2.0, height / 2.0) - center,
        }
    }

    pub fn to_screen(&self, coord: Coordinates) -> Vec2 {
        self.origin + axial_to_cartesian(coord, self.size)
    }
}

/// Center of a pointy-top hexagon of radius `size`, the origin cell at (0, 0).
pub fn axial_to_cartesian(coord: Coordinates, size: f32) -> Vec2 {
    let q = coord.q as f32;
    let r = coord.r as f32;
    vec2(size * SQRT_3 * (q + r / 2.0), size * 1.5 * r)
}

pub fn player_color(color: i32) -> Color {
    if color == NEUTRAL_COLOR {
        return Color::from_rgba(68, 68, 68, 255);
    }
    match color.rem_euclid(8) {
        1 => Color::from_rgba(255, 68, 68, 255),
        2 => Color::from_rgba(0, 170, 255, 255),
        3 => GREEN,
        4 => YELLOW,
        5 => MAGENTA,
        6 => Color::from_rgba(0, 255, 255, 255),
        7 => ORANGE,
        _ => Color::from_rgba(136, 136, 136, 255),
    }
}

/// Window renderer for spectated hexabomb games.
pub struct HexRenderer {
    width: f32,
    height: f32,
    scene: Option<GameStateModel>,
    max_turns: u32,
    game_over: bool,
    last_error: Option<(String, bool)>,
}

impl HexRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        // Window close goes through request_shutdown so the network thread can be stopped.
        prevent_quit();

        Self {
            width: width as f32,
            height: height as f32,
            scene: None,
            max_turns: 0,
            game_over: false,
            last_error: None,
        }
    }

    pub fn conf(width: usize, height: usize) -> Conf {
        Conf {
            window_title: "hexabomb".to_string(),
            window_width: width as i32,
            window_height: height as i32,
            ..Default::default()
        }
    }

    pub fn draw(&mut self) {
        clear_background(Color::from_rgba(26, 26, 26, 255));
        self.width = screen_width();
        self.height = screen_height();

        match &self.scene {
            Some(model) => {
                let board_width = (self.width - HUD_WIDTH - 2.0 * MARGIN).max(1.0);
                let board_height = (self.height - 2.0 * MARGIN).max(1.0);
                let mut layout = HexLayout::fit(model.cells().keys(), board_width, board_height);
                layout.origin += vec2(HUD_WIDTH + MARGIN, MARGIN);

                self.draw_board(model, &layout);
                self.draw_hud(model);
            }
            None => {
                draw_text("Waiting for the game to start...", MARGIN, MARGIN * 2.0, 24.0, WHITE);
            }
        }

        self.draw_error();
    }

    fn draw_board(&self, model: &GameStateModel, layout: &HexLayout) {
        for (coord, cell) in model.cells() {
            let center = layout.to_screen(*coord);
            draw_hexagon(
                center.x,
                center.y,
                layout.size,
                1.0,
                true,
                Color::from_rgba(26, 26, 26, 255),
                player_color(cell.color),
            );
        }

        if let Some(explosions) = model.explosions() {
            for (color, coords) in explosions {
                let mut flash = player_color(*color);
                flash.a = 0.6;
                for coord in coords {
                    let center = layout.to_screen(*coord);
                    draw_hexagon(center.x, center.y, layout.size * 0.8, 0.0, true, WHITE, flash);
                }
            }
        }

        for bomb in model.bombs() {
            let center = layout.to_screen(bomb.coord);
            let radius = layout.size * 0.35;
            draw_circle(center.x, center.y, radius, BLACK);
            draw_circle_lines(center.x, center.y, radius, 2.0, player_color(bomb.color));
            draw_text(
                &bomb.delay.to_string(),
                center.x - radius / 2.0,
                center.y + radius / 2.0,
                radius * 1.5,
                WHITE,
            );
        }

        for character in model.characters() {
            let center = layout.to_screen(character.coord);
            let radius = layout.size * 0.5;
            if character.is_alive {
                draw_circle(center.x, center.y, radius, player_color(character.color));
                draw_circle_lines(center.x, center.y, radius, 2.0, WHITE);
            } else {
                draw_circle_lines(center.x, center.y, radius, 1.0, GRAY);
                draw_text(
                    &character.revive_delay.to_string(),
                    center.x - radius / 2.0,
                    center.y + radius / 2.0,
                    radius * 1.5,
                    GRAY,
                );
            }
        }
    }

    fn draw_hud(&self, model: &GameStateModel) {
        let x = MARGIN;
        let mut y = MARGIN * 2.0;

        let title = if self.game_over {
            format!("Game over at turn {}", model.turn_number())
        } else {
            format!("Turn {}/{}", model.turn_number(), self.max_turns)
        };
        draw_text(&title, x, y, 22.0, WHITE);
        y += 30.0;

        draw_text(
            &format!("{} neutral cells", model.neutral_cell_count()),
            x,
            y,
            16.0,
            LIGHTGRAY,
        );
        y += 25.0;

        for (color, score) in model.score() {
            let cells = model.cell_count().get(color).copied().unwrap_or(0);
            draw_rectangle(x, y - 10.0, 10.0, 10.0, player_color(*color));
            draw_text(
                &format!("{}: {} pts, {} cells", color, score, cells),
                x + 15.0,
                y,
                16.0,
                WHITE,
            );
            y += 20.0;
        }
        y += 10.0;

        for player in model.players_info() {
            let status = if player.is_connected { GREEN } else { RED };
            draw_rectangle(x, y - 8.0, 8.0, 8.0, status);
            draw_text(
                &format!("{} ({})", player.nickname, player.remote_address),
                x + 15.0,
                y,
                14.0,
                WHITE,
            );
            y += 18.0;
        }
    }

    fn draw_error(&self) {
        if let Some((message, fatal)) = &self.last_error {
            let color = if *fatal { RED } else { YELLOW };
            draw_text(message, MARGIN, self.height - MARGIN, 18.0, color);
        }
    }
}

impl Renderer for HexRenderer {
    fn on_init(&mut self, model: &GameStateModel, max_turns: u32, players_info: &[PlayerInfo]) {
        info!(
            "Rendering a {}-cell board for {} players",
            model.cells().len(),
            players_info.len()
        );
        self.max_turns = max_turns;
        self.game_over = false;
        self.scene = Some(model.clone());
    }

    fn on_turn(
        &mut self,
        model: &GameStateModel,
        _turn_number: u32,
        max_turns: u32,
        _explosions: Option<&Explosions>,
        _players_info: &[PlayerInfo],
    ) {
        self.max_turns = max_turns;
        self.scene = Some(model.clone());
    }

    fn on_end(&mut self, model: &GameStateModel) {
        self.game_over = true;
        self.scene = Some(model.clone());
    }

    fn on_error(&mut self, message: &str, fatal: bool) {
        warn!("Displaying error: {}", message);
        self.last_error = Some((message.to_string(), fatal));
    }

    fn request_shutdown(&mut self) -> bool {
        is_quit_requested() || is_key_pressed(KeyCode::Escape)
    }
}
