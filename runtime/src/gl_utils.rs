use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;
use std::mem::size_of_val;
use std::ptr;

use anyhow::{bail, Context};
use bytemuck::Pod;
use gl::types::{GLenum, GLint, GLsizei, GLsizeiptr, GLuint};
use glfw::Window;

pub fn load_gl(window: &mut Window) -> anyhow::Result<()> {
    gl::load_with(|symbol| window.get_proc_address(symbol) as *const _);
    if !gl::GetString::is_loaded() {
        bail!("unable to load OpenGL function pointers");
    }
    Ok(())
}

pub fn gl_version_string() -> anyhow::Result<String> {
    let version = unsafe { gl::GetString(gl::VERSION) };
    if version.is_null() {
        bail!("unable to determine OpenGL version");
    }
    let version = unsafe { CStr::from_ptr(version.cast::<c_char>()) };
    Ok(version.to_string_lossy().into_owned())
}

pub fn gl_error_name(error: GLenum) -> &'static str {
    match error {
        gl::INVALID_ENUM => "INVALID_ENUM",
        gl::INVALID_VALUE => "INVALID_VALUE",
        gl::INVALID_OPERATION => "INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        _ => "UNKNOWN_ERROR",
    }
}

/// Drains the GL error queue, failing with the first error found.
///
/// Does nothing unless the `gl_error_checks` feature is enabled.
pub fn check_gl_error(what: &str) -> anyhow::Result<()> {
    if !cfg!(feature = "gl_error_checks") {
        return Ok(());
    }

    let mut first = None;
    loop {
        let error = unsafe { gl::GetError() };
        if error == gl::NO_ERROR {
            break;
        }
        log::warn!("OpenGL error during {what}: {}", gl_error_name(error));
        first.get_or_insert(error);
    }

    match first {
        Some(error) => bail!("OpenGL error during {what}: {}", gl_error_name(error)),
        None => Ok(()),
    }
}

pub fn set_viewport(width: i32, height: i32) {
    unsafe { gl::Viewport(0, 0, width, height) }
}

pub fn clear(color: [f32; 4]) {
    let [r, g, b, a] = color;
    unsafe {
        gl::ClearColor(r, g, b, a);
        gl::Clear(gl::COLOR_BUFFER_BIT);
    }
}

pub fn draw_triangles(first: i32, count: i32) {
    unsafe { gl::DrawArrays(gl::TRIANGLES, first, count) }
}

/// Turns a raw GL info log into a string, dropping the NUL terminator and
/// any trailing padding.
pub fn info_log_to_string(mut bytes: Vec<u8>) -> String {
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    String::from_utf8_lossy(&bytes).trim_end().to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderKind::Vertex => gl::VERTEX_SHADER,
            ShaderKind::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => f.write_str("vertex"),
            ShaderKind::Fragment => f.write_str("fragment"),
        }
    }
}

pub struct Shader {
    id: GLuint,
    kind: ShaderKind,
}

impl Shader {
    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn destroy(self) {
        unsafe { gl::DeleteShader(self.id) }
    }
}

pub fn compile_shader(kind: ShaderKind, source: &str) -> anyhow::Result<Shader> {
    let source = CString::new(source)
        .with_context(|| format!("{kind} shader source contains a NUL byte"))?;

    let shader = Shader {
        id: unsafe { gl::CreateShader(kind.gl_enum()) },
        kind,
    };
    if shader.id == 0 {
        bail!("failed to create {kind} shader");
    }

    let mut success: GLint = 0;
    unsafe {
        gl::ShaderSource(shader.id, 1, &source.as_ptr(), ptr::null());
        gl::CompileShader(shader.id);
        gl::GetShaderiv(shader.id, gl::COMPILE_STATUS, &mut success);
    }
    if success == 0 {
        let log = shader_info_log(shader.id);
        shader.destroy();
        bail!("failed to compile {kind} shader: {log}");
    }

    log::debug!("compiled {kind} shader {}", shader.id);
    Ok(shader)
}

fn shader_info_log(id: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetShaderiv(id, gl::INFO_LOG_LENGTH, &mut len) };
    let mut buffer = vec![0u8; len.max(1) as usize];
    unsafe {
        gl::GetShaderInfoLog(
            id,
            buffer.len() as GLsizei,
            ptr::null_mut(),
            buffer.as_mut_ptr().cast(),
        )
    };
    info_log_to_string(buffer)
}

pub struct Program {
    id: GLuint,
}

impl Program {
    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) }
    }

    pub fn destroy(self) {
        unsafe { gl::DeleteProgram(self.id) }
    }
}

/// Links `shaders` into a program. The shaders are consumed and deleted
/// whether or not linking succeeds.
pub fn link_program(shaders: Vec<Shader>) -> anyhow::Result<Program> {
    let program = Program {
        id: unsafe { gl::CreateProgram() },
    };
    if program.id == 0 {
        shaders.into_iter().for_each(Shader::destroy);
        bail!("failed to create shader program");
    }

    let mut success: GLint = 0;
    unsafe {
        for shader in &shaders {
            gl::AttachShader(program.id, shader.id());
        }
        gl::LinkProgram(program.id);
        gl::GetProgramiv(program.id, gl::LINK_STATUS, &mut success);
        for shader in &shaders {
            gl::DetachShader(program.id, shader.id());
        }
    }
    shaders.into_iter().for_each(Shader::destroy);

    if success == 0 {
        let log = program_info_log(program.id);
        program.destroy();
        bail!("failed to link shaders: {log}");
    }

    log::debug!("linked shader program {}", program.id);
    Ok(program)
}

fn program_info_log(id: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetProgramiv(id, gl::INFO_LOG_LENGTH, &mut len) };
    let mut buffer = vec![0u8; len.max(1) as usize];
    unsafe {
        gl::GetProgramInfoLog(
            id,
            buffer.len() as GLsizei,
            ptr::null_mut(),
            buffer.as_mut_ptr().cast(),
        )
    };
    info_log_to_string(buffer)
}

pub struct Buffer {
    id: GLuint,
    len: usize,
}

impl Buffer {
    /// Creates an `ARRAY_BUFFER` holding `data`, uploaded once with `STATIC_DRAW`.
    pub fn new_array<T: Pod>(data: &[T]) -> anyhow::Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut id: GLuint = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
            gl::BindBuffer(gl::ARRAY_BUFFER, id);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                size_of_val(bytes) as GLsizeiptr,
                bytes.as_ptr().cast::<c_void>(),
                gl::STATIC_DRAW,
            );
        }
        check_gl_error("vertex buffer upload")?;
        Ok(Self {
            id,
            len: bytes.len(),
        })
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn destroy(self) {
        unsafe { gl::DeleteBuffers(1, &self.id) }
    }
}

pub struct VertexArray {
    id: GLuint,
}

impl VertexArray {
    /// Generates a vertex array and leaves it bound.
    pub fn new() -> Self {
        let mut id: GLuint = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut id);
            gl::BindVertexArray(id);
        }
        Self { id }
    }

    pub fn bind(&self) {
        unsafe { gl::BindVertexArray(self.id) }
    }

    /// Describes a float attribute sourced from the currently bound
    /// `ARRAY_BUFFER`, and enables it.
    pub fn float_attribute(&self, index: u32, components: i32, stride: usize, offset: usize) {
        self.bind();
        unsafe {
            gl::VertexAttribPointer(
                index,
                components,
                gl::FLOAT,
                gl::FALSE,
                stride as GLsizei,
                offset as *const c_void,
            );
            gl::EnableVertexAttribArray(index);
        }
    }

    pub fn destroy(self) {
        unsafe { gl::DeleteVertexArrays(1, &self.id) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_kinds_map_to_gl_enums() {
        assert_eq!(ShaderKind::Vertex.gl_enum(), gl::VERTEX_SHADER);
        assert_eq!(ShaderKind::Fragment.gl_enum(), gl::FRAGMENT_SHADER);
    }

    #[test]
    fn shader_kinds_are_named_in_diagnostics() {
        assert_eq!(ShaderKind::Vertex.to_string(), "vertex");
        assert_eq!(ShaderKind::Fragment.to_string(), "fragment");
    }

    #[test]
    fn info_log_stops_at_nul() {
        let mut raw = b"0:3(1): error: syntax error\n\0".to_vec();
        raw.extend_from_slice(&[0; 16]);
        assert_eq!(info_log_to_string(raw), "0:3(1): error: syntax error");
    }

    #[test]
    fn empty_info_log() {
        assert_eq!(info_log_to_string(vec![0]), "");
        assert_eq!(info_log_to_string(Vec::new()), "");
    }

    #[test]
    fn gl_errors_have_names() {
        assert_eq!(gl_error_name(gl::INVALID_ENUM), "INVALID_ENUM");
        assert_eq!(gl_error_name(gl::INVALID_OPERATION), "INVALID_OPERATION");
        assert_eq!(gl_error_name(gl::OUT_OF_MEMORY), "OUT_OF_MEMORY");
        assert_eq!(gl_error_name(0xdead), "UNKNOWN_ERROR");
    }
}
