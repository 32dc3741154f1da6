//! Compiler configuration for embedders and the CLI driver.

/// What `compile_file` asks `clang` to emit from the generated IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitKind {
    #[default]
    Object,
    Assembly,
}

/// Relocation model passed through to `clang -frelocation-model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationModel {
    #[default]
    Pic,
    Static,
}

impl RelocationModel {
    pub fn clang_flag(self) -> &'static str {
        match self {
            RelocationModel::Pic => "-fPIC",
            RelocationModel::Static => "-fno-pic",
        }
    }
}

/// Configuration for a single `compile_file` invocation. Builder-style,
/// so the library is usable both from the CLI and from embedders that
/// want different defaults.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub opt_level: u8,
    pub relocation_model: RelocationModel,
    pub emit: EmitKind,
    pub keep_ir: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            opt_level: 0,
            relocation_model: RelocationModel::default(),
            emit: EmitKind::default(),
            keep_ir: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_opt_level(mut self, level: u8) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_relocation_model(mut self, model: RelocationModel) -> Self {
        self.relocation_model = model;
        self
    }

    pub fn with_emit(mut self, emit: EmitKind) -> Self {
        self.emit = emit;
        self
    }

    pub fn with_keep_ir(mut self, keep_ir: bool) -> Self {
        self.keep_ir = keep_ir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_unoptimized_pic_object() {
        let config = CompilerConfig::new();
        assert_eq!(config.opt_level, 0);
        assert_eq!(config.relocation_model, RelocationModel::Pic);
        assert_eq!(config.emit, EmitKind::Object);
        assert!(!config.keep_ir);
    }

    #[test]
    fn builder_overrides_each_field() {
        let config = CompilerConfig::new()
            .with_opt_level(2)
            .with_relocation_model(RelocationModel::Static)
            .with_emit(EmitKind::Assembly)
            .with_keep_ir(true);
        assert_eq!(config.opt_level, 2);
        assert_eq!(config.relocation_model, RelocationModel::Static);
        assert_eq!(config.emit, EmitKind::Assembly);
        assert!(config.keep_ir);
    }
}
