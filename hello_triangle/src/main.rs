use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glfw::WindowEvent;
use log::{error, info, trace};
use runtime::gl_utils::{
    check_gl_error, clear, compile_shader, draw_triangles, link_program, Buffer, Program,
    ShaderKind, VertexArray,
};
use runtime::logging::{init_logging, LoggingConfig};
use runtime::{App, AppContext};

const TITLE: &str = "Hello, Triangle!";

const CLEAR_COLOR: [f32; 4] = [0.7, 0.8, 0.7, 1.0];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
}

const VERTICES: [Vertex; 3] = [
    Vertex { position: [-0.5, -0.5] },
    Vertex { position: [0.5, -0.5] },
    Vertex { position: [0.0, 0.5] },
];

const VERTEX_SHADER_SOURCE: &str = r#"#version 330 core
layout (location = 0) in vec2 aPos;
void main()
{
    gl_Position = vec4(aPos.x, aPos.y, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER_SOURCE: &str = r#"#version 330 core
out vec4 FragColor;
void main()
{
    FragColor = vec4(0.0f, 0.3f, 0.8f, 1.0f);
}
"#;

const POSITION_LOCATION: u32 = 0;

struct Triangle {
    program: Program,
    vertex_array: VertexArray,
    vertex_buffer: Buffer,
}

impl Triangle {
    fn new() -> anyhow::Result<Self> {
        let vertex_shader = compile_shader(ShaderKind::Vertex, VERTEX_SHADER_SOURCE)?;
        let fragment_shader = match compile_shader(ShaderKind::Fragment, FRAGMENT_SHADER_SOURCE) {
            Ok(shader) => shader,
            Err(err) => {
                vertex_shader.destroy();
                return Err(err);
            }
        };
        let program = link_program(vec![vertex_shader, fragment_shader])?;

        let vertex_array = VertexArray::new();
        let vertex_buffer = Buffer::new_array(&VERTICES)?;
        vertex_array.float_attribute(
            POSITION_LOCATION,
            2,
            size_of::<Vertex>(),
            offset_of!(Vertex, position),
        );
        check_gl_error("vertex array setup")?;

        Ok(Self {
            program,
            vertex_array,
            vertex_buffer,
        })
    }

    fn draw(&self) {
        self.program.bind();
        self.vertex_array.bind();
        draw_triangles(0, VERTICES.len() as i32);
    }

    fn destroy(self) {
        self.vertex_array.destroy();
        self.vertex_buffer.destroy();
        self.program.destroy();
    }
}

#[derive(Default)]
struct HelloTriangle {
    triangle: Option<Triangle>,
}

impl App for HelloTriangle {
    fn get_title(&mut self) -> anyhow::Result<String> {
        Ok(String::from(TITLE))
    }

    fn init(&mut self, _ctx: &mut AppContext) -> anyhow::Result<()> {
        let triangle = Triangle::new()?;
        info!(
            "uploaded {} vertices ({} bytes)",
            VERTICES.len(),
            triangle.vertex_buffer.len()
        );
        self.triangle = Some(triangle);
        Ok(())
    }

    fn event(&mut self, _ctx: &mut AppContext, event: WindowEvent) -> anyhow::Result<()> {
        trace!("{event:?}");
        Ok(())
    }

    fn frame(&mut self, _ctx: &mut AppContext) -> anyhow::Result<()> {
        clear(CLEAR_COLOR);
        if let Some(triangle) = &self.triangle {
            triangle.draw();
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut AppContext) {
        if let Some(triangle) = self.triangle.take() {
            triangle.destroy();
        }
    }
}

fn main() {
    init_logging(LoggingConfig::default());
    info!("{TITLE}");

    if let Err(err) = runtime::run(HelloTriangle::default()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_are_tightly_packed_pairs() {
        assert_eq!(size_of::<Vertex>(), 2 * size_of::<f32>());
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&VERTICES).len(), 24);
    }

    #[test]
    fn triangle_covers_the_center() {
        let flat: &[f32] = bytemuck::cast_slice(&VERTICES);
        assert_eq!(flat, &[-0.5, -0.5, 0.5, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn shaders_target_glsl_330_core() {
        for source in [VERTEX_SHADER_SOURCE, FRAGMENT_SHADER_SOURCE] {
            assert!(source.starts_with("#version 330 core\n"));
            assert!(!source.contains('\0'));
        }
        assert!(VERTEX_SHADER_SOURCE.contains("layout (location = 0) in vec2 aPos;"));
    }

    #[test]
    fn window_is_titled_hello_triangle() {
        let mut app = HelloTriangle::default();
        assert_eq!(app.get_title().unwrap(), "Hello, Triangle!");
        assert_eq!(app.get_window_size().unwrap(), (800, 600));
    }
}
