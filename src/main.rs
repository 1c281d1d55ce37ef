// =============================================================================
// GFX-BOOTSTRAP DEMO SHELL
// =============================================================================
//
// Opens a window, bootstraps the graphics context against it and keeps
// presenting swapchain images until the window closes.
//
// FRAME FLOW:
// 1. Recreate the swapchain if the window changed size
// 2. Acquire the next image, clear it and present it
// 3. Out-of-date or suboptimal results schedule a recreate
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk;
use gfx_bootstrap::backend::{GraphicsContext, PresentStatus};
use gfx_bootstrap::config::Config;
use std::fs::File;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let (config, source) = Config::load();

    init_logging(&config);
    log::info!("Starting gfx-bootstrap");
    source.log();
    log::debug!("Config: {:?}", config);
    log::info!("Window: {}x{}", config.window.width, config.window.height);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop terminated abnormally")?;

    app.result
}

/// Initialize logging; RUST_LOG overrides the configured level.
fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level_filter());
    builder.parse_default_env();

    if config.logging.log_to_file {
        match File::create(&config.logging.log_file) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", config.logging.log_file, e),
        }
    }

    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// The graphics context is shut down in `exiting`, while the window it
/// presents to is still alive.
struct App {
    config: Config,
    context: GraphicsContext,
    window: Option<Arc<Window>>,
    is_minimized: bool,
    needs_resize: bool,
    frame_count: u32,
    last_fps_update: Instant,
    result: Result<()>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: GraphicsContext::new(),
            window: None,
            is_minimized: false,
            needs_resize: false,
            frame_count: 0,
            last_fps_update: Instant::now(),
            result: Ok(()),
        }
    }

    fn render_frame(&mut self) -> Result<()> {
        if self.is_minimized {
            return Ok(());
        }

        if self.needs_resize {
            if let Some(window) = &self.window {
                let size = window.inner_size();
                self.context
                    .resize(vk::Extent2D {
                        width: size.width,
                        height: size.height,
                    })
                    .context("Failed to recreate swapchain")?;
            }
            self.needs_resize = false;
        }

        match self.context.present().context("Present failed")? {
            PresentStatus::Presented => self.update_fps(),
            PresentStatus::Suboptimal | PresentStatus::OutOfDate => self.needs_resize = true,
            PresentStatus::Skipped => {}
        }
        Ok(())
    }

    fn update_fps(&mut self) {
        self.frame_count += 1;
        let elapsed = self.last_fps_update.elapsed();
        if elapsed.as_secs_f32() >= 1.0 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = &self.window {
                window.set_title(&format!("{} | {:.0} FPS", self.config.window.title, fps));
            }
            self.frame_count = 0;
            self.last_fps_update = Instant::now();
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.result = Err(e).context("Failed to create window");
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.context.initialize(&*window) {
            self.result = Err(e).context("Failed to initialize graphics context");
            event_loop.exit();
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                self.is_minimized = size.width == 0 || size.height == 0;
                self.needs_resize = true;
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    log::error!("Render error: {:?}", e);
                    self.result = Err(e);
                    event_loop.exit();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Request continuous redraws.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.context.shutdown();
        self.window = None;
    }
}
