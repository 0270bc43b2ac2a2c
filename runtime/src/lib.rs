use anyhow::Context;
use glfw::{Context as _, Glfw, OpenGlProfileHint, SwapInterval, Window, WindowEvent, WindowHint, WindowMode};
use log::{debug, info};

use crate::gl_utils::{gl_version_string, load_gl, set_viewport};

pub mod gl_utils;
pub mod logging;

pub struct AppContext {
    glfw: Glfw,
    main_window: Window,
}

impl AppContext {
    pub fn glfw(&self) -> &Glfw {
        &self.glfw
    }

    pub fn main_window(&self) -> &Window {
        &self.main_window
    }

    pub fn main_window_mut(&mut self) -> &mut Window {
        &mut self.main_window
    }
}

pub trait App {
    fn get_window_size(&self) -> anyhow::Result<(u32, u32)> {
        Ok((800, 600))
    }

    fn get_gl_version(&self) -> anyhow::Result<(u32, u32)> {
        Ok((3, 3))
    }

    fn get_swap_interval(&self) -> anyhow::Result<SwapInterval> {
        Ok(SwapInterval::Sync(1))
    }

    fn get_title(&mut self) -> anyhow::Result<String>;

    fn init(&mut self, ctx: &mut AppContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn event(&mut self, ctx: &mut AppContext, event: WindowEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn frame(&mut self, ctx: &mut AppContext) -> anyhow::Result<()>;

    // Called while the GL context is still current, so GL objects can be released.
    fn destroy(&mut self, ctx: &mut AppContext) {}
}

pub fn run(mut app: impl App) -> anyhow::Result<()> {
    let mut glfw = glfw::init(glfw::LOG_ERRORS).context("unable to initialize GLFW")?;
    info!("compiled against GLFW {}", glfw::get_version_string());

    let (major, minor) = app.get_gl_version()?;
    glfw.window_hint(WindowHint::ContextVersion(major, minor));
    glfw.window_hint(WindowHint::OpenGlForwardCompat(true));
    glfw.window_hint(WindowHint::OpenGlProfile(OpenGlProfileHint::Core));

    let (width, height) = app.get_window_size()?;
    let (mut main_window, events) = glfw
        .create_window(width, height, &app.get_title()?, WindowMode::Windowed)
        .context("unable to create window")?;
    main_window.make_current();
    main_window.set_framebuffer_size_polling(true);

    load_gl(&mut main_window)?;
    info!("OpenGL {}", gl_version_string()?);

    glfw.set_swap_interval(app.get_swap_interval()?);

    let mut ctx = AppContext { glfw, main_window };

    let mut result = app.init(&mut ctx);
    while result.is_ok() && !ctx.main_window.should_close() {
        result = app.frame(&mut ctx);
        ctx.main_window.swap_buffers();
        ctx.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&events) {
            if result.is_err() {
                break;
            }
            result = handle_event(&mut app, &mut ctx, event);
        }
    }

    app.destroy(&mut ctx);
    debug!("main window closed");

    result
}

fn handle_event(app: &mut impl App, ctx: &mut AppContext, event: WindowEvent) -> anyhow::Result<()> {
    if let WindowEvent::FramebufferSize(width, height) = event {
        debug!("framebuffer resized to {width}x{height}");
        set_viewport(width, height);
    }

    app.event(ctx, event)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    impl App for Minimal {
        fn get_title(&mut self) -> anyhow::Result<String> {
            Ok(String::from("Minimal"))
        }

        fn frame(&mut self, _ctx: &mut AppContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn default_window_is_800_by_600() {
        assert_eq!(Minimal.get_window_size().unwrap(), (800, 600));
    }

    #[test]
    fn default_context_is_gl_3_3() {
        assert_eq!(Minimal.get_gl_version().unwrap(), (3, 3));
    }

    #[test]
    fn default_swap_interval_is_vsync() {
        assert!(matches!(
            Minimal.get_swap_interval().unwrap(),
            SwapInterval::Sync(1)
        ));
    }
}
