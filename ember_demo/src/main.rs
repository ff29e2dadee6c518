//! Shapes demo application
//!
//! Opens a window and draws the built-in shapes under a 2D camera. A button
//! recolors the circle when a font is available (`EMBER_FONT` overrides the
//! font path).
//!
//! Usage: `shapes_demo [config.toml|config.ron]`
//!
//! Controls: mouse wheel zooms, arrow keys pan, Escape quits.

use ember_engine::foundation::logging;
use ember_engine::prelude::*;

const DEFAULT_CONFIG: &str = "ember_demo.toml";
const FONT_PATH: &str = "resources/fonts/demo.ttf";
const FONT_SIZE: u32 = 20;
const PAN_STEP: f32 = 20.0;

const PALETTE: [Color; 4] = [
    Color::rgb(230, 90, 70),
    Color::rgb(90, 180, 110),
    Color::rgb(80, 130, 220),
    Color::rgb(230, 200, 80),
];

struct Scene {
    circle: Shape<'static>,
    rounded: Shape<'static>,
    triangle: Shape<'static>,
    ellipse: Shape<'static>,
    palette_index: usize,
}

impl Scene {
    fn new() -> Self {
        let mut circle = Shape::circle(60.0, 48);
        circle.set_position(Vec2::new(80.0, 80.0));
        circle.set_fill_color(PALETTE[0]);

        let mut rounded = Shape::rounded_rect(Vec2::new(220.0, 120.0), 18.0, 8);
        rounded.set_position(Vec2::new(280.0, 70.0));
        rounded.set_fill_color(Color::rgb(70, 70, 90));

        let mut triangle = Shape::convex(vec![Vec2::new(0.0, -60.0), Vec2::new(52.0, 30.0), Vec2::new(-52.0, 30.0)]);
        triangle.set_position(Vec2::new(620.0, 140.0));
        triangle.set_fill_color(Color::rgb(200, 120, 220));

        let mut ellipse = Shape::ellipse(Vec2::new(120.0, 50.0), 64);
        ellipse.set_position(Vec2::new(120.0, 300.0));
        ellipse.set_fill_color(Color::rgba(80, 200, 220, 180));

        Self {
            circle,
            rounded,
            triangle,
            ellipse,
            palette_index: 0,
        }
    }

    fn cycle_color(&mut self) {
        self.palette_index = (self.palette_index + 1) % PALETTE.len();
        self.circle.set_fill_color(PALETTE[self.palette_index]);
    }

    fn animate(&mut self, dt: f32) {
        self.triangle.transformable_mut().rotate(45.0 * dt);
    }

    fn draw(&mut self, renderer: &mut Renderer) {
        renderer.draw(&mut self.ellipse);
        renderer.draw(&mut self.rounded);
        renderer.draw(&mut self.circle);
        renderer.draw(&mut self.triangle);
    }
}

fn load_config(path: &str) -> EngineConfig {
    let loaded = EngineConfig::load_from_file(path);
    let config = loaded.as_ref().map_or_else(|_| EngineConfig::default(), Clone::clone);
    logging::init(&config.logging);
    if let Err(e) = loaded {
        log::warn!("Using default configuration, could not load {path}: {e}");
    }
    config
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = load_config(&config_path);

    let mut window = Window::new(&config.window)?;
    let device = window.create_device(config.renderer.diagnostics);
    let mut renderer = Renderer::new(device.clone());
    let mut camera = Camera2D::for_framebuffer(window.framebuffer_size());

    let mut fonts = FontManager::new(device);
    let font_path = std::env::var("EMBER_FONT").unwrap_or_else(|_| FONT_PATH.to_string());
    let font = fonts.load(&font_path, FONT_SIZE).ok();
    if font.is_none() {
        log::warn!("No font at {font_path}, running without the button");
    }
    let mut button = font.map(|font| Button::new("Recolor", font, Vec2::new(280.0, 220.0), Vec2::new(160.0, 44.0)));

    let mut scene = Scene::new();
    let mut last_time = window.time();
    let mut frame: u64 = 0;

    while window.is_open() {
        window.poll_events();
        while let Some(event) = window.poll_event() {
            if let Some(button) = button.as_mut() {
                if button.handle_event(&event) {
                    continue;
                }
            }
            match event {
                Event::Closed
                | Event::KeyPressed {
                    key: Key::Escape, ..
                } => window.close(),
                Event::FramebufferResized { width, height } => {
                    camera.set_center(Vec2::new(width as f32 * 0.5, height as f32 * 0.5));
                }
                Event::MouseWheelScrolled { dy, .. } => camera.set_zoom(camera.zoom() * 1.1_f32.powf(dy)),
                Event::KeyPressed { key, .. } => match key {
                    Key::Left => camera.move_by(Vec2::new(-PAN_STEP, 0.0)),
                    Key::Right => camera.move_by(Vec2::new(PAN_STEP, 0.0)),
                    Key::Up => camera.move_by(Vec2::new(0.0, -PAN_STEP)),
                    Key::Down => camera.move_by(Vec2::new(0.0, PAN_STEP)),
                    _ => {}
                },
                _ => {}
            }
        }
        if button.as_mut().is_some_and(Button::take_clicked) {
            scene.cycle_color();
        }

        let now = window.time();
        scene.animate((now - last_time) as f32);
        last_time = now;

        renderer.begin_frame(config.renderer.clear_color, &window);
        renderer.set_camera(&mut camera, &window);
        scene.draw(&mut renderer);
        if let Some(button) = button.as_mut() {
            renderer.draw(button);
        }
        window.display();

        frame += 1;
        if frame % 600 == 0 {
            log::debug!("Frame {frame}: {:?}", renderer.stats());
        }
    }

    log::info!("Window closed after {frame} frames");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("Demo failed: {e}");
        eprintln!("shapes_demo: {e}");
        std::process::exit(1);
    }
}
