//! Boss Breaker entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    use boss_breaker::consts::*;
    use boss_breaker::sim::TickInput;
    use boss_breaker::{FixedStepLoop, SimSettings, Simulation};

    /// Game instance holding all state
    struct Game {
        sim: Simulation,
        frame_loop: FixedStepLoop,
        last_time: f64,
        /// Pending requestAnimationFrame id, cancelled on stop
        frame_id: Option<i32>,
        idle_mode: bool,
    }

    impl Game {
        fn new(seed: u64, settings: SimSettings) -> Option<Self> {
            let frame_loop = match FixedStepLoop::new(settings.game_loop.clone()) {
                Ok(l) => l,
                Err(e) => {
                    log::error!("Invalid loop settings: {}", e);
                    return None;
                }
            };
            let sim = match Simulation::new(seed, settings) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("Invalid simulation settings: {}", e);
                    return None;
                }
            };
            Some(Self {
                sim,
                frame_loop,
                last_time: 0.0,
                frame_id: None,
                idle_mode: false,
            })
        }

        fn queue(&mut self, input: TickInput) {
            self.sim.queue_input(TickInput {
                idle_mode: self.idle_mode,
                ..input
            });
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let world = self.sim.world();
            let fields = [
                ("#hud-score .hud-value", world.score.to_string()),
                ("#hud-lives .hud-value", world.lives.to_string()),
                ("#hud-level .hud-value", world.level.to_string()),
                ("#hud-fps .hud-value", format!("{:.0}", self.frame_loop.fps())),
            ];
            for (selector, text) in fields {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    el.set_text_content(Some(&text));
                }
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Boss Breaker starting...");

        let seed = js_sys::Date::now() as u64;
        let Some(game) = Game::new(seed, SimSettings::load()) else {
            return;
        };
        let game = Rc::new(RefCell::new(game));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(game.clone());
        request_animation_frame(game);

        log::info!("Boss Breaker running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Mouse steers the paddle (page coordinates scaled to the playfield)
        {
            let game = game.clone();
            let win = window.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let width = win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
                let height = win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
                let x = event.client_x() as f64 / width.max(1.0) * PLAYFIELD_WIDTH as f64;
                let y = event.client_y() as f64 / height.max(1.0) * PLAYFIELD_HEIGHT as f64;
                game.borrow_mut().queue(TickInput {
                    paddle_target: Some(glam::Vec2::new(x as f32, y as f32)),
                    ..Default::default()
                });
            });
            let _ = window
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click launches
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().queue(TickInput {
                    launch: true,
                    ..Default::default()
                });
            });
            let _ = window
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    " " | "Enter" => g.queue(TickInput {
                        launch: true,
                        ..Default::default()
                    }),
                    "ArrowLeft" => g.queue(TickInput {
                        paddle_axis: -1.0,
                        ..Default::default()
                    }),
                    "ArrowRight" => g.queue(TickInput {
                        paddle_axis: 1.0,
                        ..Default::default()
                    }),
                    "Escape" => {
                        if g.frame_loop.is_paused() {
                            g.frame_loop.resume();
                        } else {
                            g.frame_loop.pause();
                        }
                    }
                    "+" | "=" => g.queue(TickInput {
                        skip_level: true,
                        ..Default::default()
                    }),
                    "i" | "I" => {
                        g.idle_mode = !g.idle_mode;
                        log::info!("Idle mode: {}", g.idle_mode);
                        g.queue(TickInput::default());
                    }
                    "q" | "Q" => stop(&mut g),
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard steering stops on release
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if matches!(event.key().as_str(), "ArrowLeft" | "ArrowRight") {
                    game.borrow_mut().queue(TickInput::default());
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn stop(game: &mut Game) {
        game.frame_loop.stop();
        if let (Some(id), Some(window)) = (game.frame_id.take(), web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
        log::info!("Stopped at tick {}", game.sim.world().tick_count);
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let handle = game.clone();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        if let Ok(id) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            handle.borrow_mut().frame_id = Some(id);
        }
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.frame_id = None;
            if !g.frame_loop.is_running() {
                return;
            }

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            let Game { sim, frame_loop, .. } = &mut *g;
            frame_loop.frame(dt, sim);
            for event in sim.drain_events() {
                log::debug!("{:?}", event);
            }
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use boss_breaker::consts::SIM_DT;
    use boss_breaker::sim::{GameEvent, TickInput};
    use boss_breaker::{FixedStepLoop, SimSettings, Simulation};

    env_logger::init();
    log::info!("Boss Breaker (native) starting...");

    // Optional first argument: seed
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0xB055);
    let settings = SimSettings::load();

    let mut frame_loop = match FixedStepLoop::new(settings.game_loop.clone()) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Invalid loop settings: {}", e);
            std::process::exit(1);
        }
    };
    let mut sim = match Simulation::new(seed, settings) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Invalid simulation settings: {}", e);
            std::process::exit(1);
        }
    };

    // Headless demo: the autopilot plays for a minute of simulated time
    // with slightly uneven frame pacing
    let frames = 60 * 60;
    let mut destroyed = 0usize;
    for frame in 0..frames {
        sim.queue_input(TickInput {
            idle_mode: true,
            ..Default::default()
        });
        let jitter = if frame % 7 == 0 { 0.004 } else { 0.0 };
        frame_loop.frame(SIM_DT + jitter, &mut sim);

        for event in sim.drain_events() {
            match event {
                GameEvent::BrickDestroyed { .. } => destroyed += 1,
                GameEvent::LevelCleared { .. }
                | GameEvent::BossDefeated { .. }
                | GameEvent::GameOver { .. } => log::info!("{:?}", event),
                _ => log::trace!("{:?}", event),
            }
        }

        if frame % 600 == 0 {
            match serde_json::to_string(&sim.stats()) {
                Ok(json) => log::info!("stats {}", json),
                Err(e) => log::warn!("Failed to encode stats: {}", e),
            }
        }
        if sim.is_over() {
            break;
        }
    }

    let world = sim.world();
    println!(
        "seed {}: level {}, score {}, lives {}, {} bricks destroyed, {} collisions",
        seed, world.level, world.score, world.lives, destroyed, world.counters.total
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
