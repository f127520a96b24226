// 字段编辑规则
//
// 预览与应用阶段共用同一份规则，保证应用时写入的值与预览一致

use super::error::BatchError;
use crate::descriptor::FieldMap;
use serde::{Deserialize, Serialize};

/// 编辑模式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// 覆盖：新值即为提交的值
    #[default]
    Overwrite,
    /// 追加：原值 + 分隔符 + 提交的值；原值为空时直接使用提交的值
    Append,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::Overwrite => "overwrite",
            EditMode::Append => "append",
        }
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个字段的编辑定义（任务创建后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field: String,
    pub value: String,
    pub mode: EditMode,
    pub separator: String,
}

impl FieldEdit {
    /// 创建编辑定义，字段名必须是合法的 XML 元素名
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        mode: EditMode,
        separator: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let field = field.into();
        if !is_valid_field_name(&field) {
            return Err(BatchError::InvalidField(field));
        }
        Ok(Self {
            field,
            value: value.into(),
            mode,
            separator: separator.into(),
        })
    }

    /// 根据当前值计算新值
    pub fn new_value(&self, current: Option<&str>) -> String {
        match self.mode {
            EditMode::Overwrite => self.value.clone(),
            EditMode::Append => {
                let existing = current.map(str::trim).unwrap_or_default();
                if existing.is_empty() {
                    self.value.clone()
                } else {
                    format!("{}{}{}", existing, self.separator, self.value)
                }
            }
        }
    }

    /// 在字段映射上应用编辑，返回 (旧值, 新值)
    pub fn apply_to(&self, fields: &mut FieldMap) -> (Option<String>, String) {
        let old_value = fields.get(&self.field).cloned();
        let new_value = self.new_value(old_value.as_deref());
        fields.insert(self.field.clone(), new_value.clone());
        (old_value, new_value)
    }
}

/// 字段名校验：字母或下划线开头，后续为字母、数字、`_`、`-`、`.`
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn edit(mode: EditMode, value: &str) -> FieldEdit {
        FieldEdit::new("genre", value, mode, ", ").unwrap()
    }

    #[test]
    fn test_overwrite() {
        let e = edit(EditMode::Overwrite, "Disney");
        assert_eq!(e.new_value(Some("Old Studio")), "Disney");
        assert_eq!(e.new_value(None), "Disney");
    }

    #[test]
    fn test_append() {
        let e = edit(EditMode::Append, "Drama");
        assert_eq!(e.new_value(Some("Action")), "Action, Drama");
        assert_eq!(e.new_value(Some("  Action  ")), "Action, Drama");
        assert_eq!(e.new_value(Some("")), "Drama");
        assert_eq!(e.new_value(Some("   ")), "Drama");
        assert_eq!(e.new_value(None), "Drama");
    }

    #[test]
    fn test_overwrite_then_append_round_trip() {
        let mut fields = FieldMap::new();
        fields.insert("genre".to_string(), "Action".to_string());

        let (old, new) = edit(EditMode::Overwrite, "Comedy").apply_to(&mut fields);
        assert_eq!(old.as_deref(), Some("Action"));
        assert_eq!(new, "Comedy");

        let (old, new) = edit(EditMode::Append, "Family").apply_to(&mut fields);
        assert_eq!(old.as_deref(), Some("Comedy"));
        assert_eq!(new, "Comedy, Family");
        assert_eq!(fields.get("genre").unwrap(), "Comedy, Family");
    }

    #[test]
    fn test_custom_separator() {
        let e = FieldEdit::new("tag", "B", EditMode::Append, " / ").unwrap();
        assert_eq!(e.new_value(Some("A")), "A / B");
    }

    #[test]
    fn test_field_name_validation() {
        assert!(is_valid_field_name("studio"));
        assert!(is_valid_field_name("_private"));
        assert!(is_valid_field_name("original.title-2"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("1title"));
        assert!(!is_valid_field_name("studio name"));
        assert!(!is_valid_field_name("<studio>"));

        let err = FieldEdit::new("bad name", "x", EditMode::Overwrite, ", ").unwrap_err();
        assert!(matches!(err, BatchError::InvalidField(_)));
    }

    proptest! {
        #[test]
        fn prop_append_keeps_both_parts(existing in "[a-zA-Z0-9]{1,16}", value in "[a-zA-Z0-9 ]{0,16}") {
            let e = edit(EditMode::Append, &value);
            let result = e.new_value(Some(existing.as_str()));
            prop_assert!(result.starts_with(&existing));
            prop_assert!(result.ends_with(&value));
            prop_assert_eq!(result.len(), existing.len() + 2 + value.len());
        }

        #[test]
        fn prop_overwrite_ignores_existing(existing in ".{0,16}", value in ".{0,16}") {
            let e = edit(EditMode::Overwrite, &value);
            prop_assert_eq!(e.new_value(Some(existing.as_str())), value);
        }
    }
}
