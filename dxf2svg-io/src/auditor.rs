/// 解析过程中的修复记录。`fixes` 是已自动修正的结构问题，
/// `errors` 是无法修正、导致实体被丢弃的问题。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auditor {
    fixes: Vec<String>,
    errors: Vec<String>,
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fix(&mut self, message: impl Into<String>) {
        self.fixes.push(message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    #[inline]
    pub fn fixes(&self) -> &[String] {
        &self.fixes
    }

    #[inline]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[inline]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}
