use std::sync::Arc;

use anyhow::{Context, Result};
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use wgpu_triangle::{init_logging, ContextConfig, GraphicsContext, LoggingConfig, Triangle};

struct Application {
    context: GraphicsContext,
    triangle: Triangle,
    window: Arc<Window>,
    drawn: bool,
}

impl Application {
    async fn new(event_loop: &EventLoop<()>, config: &ContextConfig) -> Result<Application> {
        let window = WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .build(event_loop)
            .context("failed to create window")?;
        let window = Arc::new(window);

        let context = GraphicsContext::for_window(Arc::clone(&window), config).await?;
        let triangle = Triangle::build(&context);
        window.request_redraw();

        Ok(Application {
            context,
            triangle,
            window,
            drawn: false,
        })
    }

    fn run(mut self, event_loop: EventLoop<()>) -> Result<()> {
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run(move |event, elwt| {
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != self.window.id() {
                return;
            }

            match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key: Key::Named(NamedKey::Escape),
                            ..
                        },
                    ..
                } => elwt.exit(),

                // Draw exactly once
                WindowEvent::RedrawRequested if !self.drawn => {
                    self.drawn = true;
                    if let Err(error) = self.triangle.draw(&self.context) {
                        log::error!("{error:#}");
                        elwt.exit();
                    }
                }

                _ => (),
            }
        })?;
        Ok(())
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = ContextConfig::default();
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let application = pollster::block_on(Application::new(&event_loop, &config))?;
    application.run(event_loop)
}
