use crate::framebuffer::{Framebuffer, Pixel, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is the presentation side: it is handed a copy of the framebuffer
/// once per frame and puts it somewhere a human can see it. The interpreter
/// doesn't know or care how.
pub trait Display {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;
}

/// how a pixel should look on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shade {
    Lit,
    /// recently unset, more than half its fade left
    Glow,
    /// unset a while ago, still not fully dark
    Dim,
    Dark,
}

impl Shade {
    pub fn of(pixel: Pixel, max_fade: u32) -> Shade {
        if pixel.is_on() {
            Shade::Lit
        } else if pixel.fade == 0 {
            Shade::Dark
        } else if pixel.fade * 2 > max_fade {
            Shade::Glow
        } else {
            Shade::Dim
        }
    }

    fn colour(self) -> Color {
        match self {
            Shade::Lit => Color::White,
            Shade::Glow => Color::Gray,
            Shade::Dim => Color::DarkGray,
            Shade::Dark => Color::Black,
        }
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel drawn in `shade`; the canvas has y
    /// going up, so rows are negated
    fn points_in_shade(&self, frame: &Framebuffer, shade: Shade) -> Vec<(f64, f64)> {
        let max_fade = frame.max_fade();
        frame
            .rows()
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter().enumerate().filter_map(move |(x, &pixel)| {
                    if Shade::of(pixel, max_fade) == shade {
                        Some((x as f64, -1.0 * y as f64))
                    } else {
                        None
                    }
                })
            })
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        // 1:1 between terminal cells, chip8 pixels and the canvas
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );
        let resolution = &self.resolution;
        let layers: Vec<(Vec<(f64, f64)>, Color)> = [Shade::Dim, Shade::Glow, Shade::Lit]
            .iter()
            .map(|&shade| (resolution.points_in_shade(frame, shade), shade.colour()))
            .collect();

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Shade::Dark.colour())),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    for (coords, color) in &layers {
                        ctx.draw(&Points {
                            coords,
                            color: *color,
                        });
                    }
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; just counts frames
pub struct DummyDisplay {
    pub frames: usize,
    pub last_lit: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            frames: 0,
            last_lit: 0,
        }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_lit = frame.lit();
        Ok(())
    }
}
