// NFO 描述文件读写
//
// 只处理根元素的直接叶子子元素（如 <title>、<studio>），
// 嵌套结构（如 <actor><name/></actor>）原样保留、不参与编辑。
// 写回时只替换发生变化的字段文本，其余字节保持不变

use super::{DescriptorError, DescriptorIo, FieldMap};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;

/// 标签匹配：注释、CDATA、声明/指令、普通元素标签
///
/// 属性值按引号整体匹配，值内的 `>` 不会提前结束标签
const TAG_PATTERN: &str = concat!(
    r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<[?!][^>]*>"#,
    r#"|<(/)?([A-Za-z_][\w.:\-]*)(?:\s+[^\s=/>]+\s*=\s*(?:"[^"]*"|'[^']*'))*\s*(/)?>"#,
);

/// 新字段的默认缩进
const DEFAULT_INDENT: &str = "    ";

/// 根元素下的叶子字段
#[derive(Debug, Clone)]
struct LeafField {
    name: String,
    value: String,
    /// 写回时替换的字节范围（普通元素为文本部分，自闭合元素为整个标签）
    span: Range<usize>,
    self_closing: bool,
}

/// 根元素的结束位置
#[derive(Debug, Clone)]
enum RootEnd {
    /// `</movie>` 的起始偏移
    Close(usize),
    /// `<movie/>` 整个标签的范围
    SelfClosing(Range<usize>),
}

/// 解析后的文档结构
#[derive(Debug)]
struct NfoDocument {
    fields: Vec<LeafField>,
    root_end: RootEnd,
    indent: String,
}

/// 正在解析的根子元素
struct OpenChild {
    name: String,
    content_start: usize,
    nested: bool,
}

/// XML `.nfo` 描述文件读写实现
#[derive(Debug, Clone)]
pub struct NfoDescriptorIo {
    tag_re: Regex,
}

impl NfoDescriptorIo {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            tag_re: Regex::new(TAG_PATTERN)?,
        })
    }

    fn load(&self, path: &Path) -> Result<String, DescriptorError> {
        fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::InvalidData {
                DescriptorError::Parse {
                    path: path.to_path_buf(),
                    message: "文件不是有效的 UTF-8 编码".to_string(),
                }
            } else {
                DescriptorError::io(path, e)
            }
        })
    }

    fn parse(&self, path: &Path, content: &str) -> Result<NfoDocument, DescriptorError> {
        let parse_error = |message: String| DescriptorError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut depth = 0usize;
        let mut root_seen = false;
        let mut root_end: Option<RootEnd> = None;
        let mut open_child: Option<OpenChild> = None;
        let mut fields = Vec::new();
        let mut indent: Option<String> = None;

        for caps in self.tag_re.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                // 注释、CDATA、声明
                continue;
            };
            let name = name.as_str();
            let is_close = caps.get(1).is_some();
            let self_closing = caps.get(3).is_some();

            if root_end.is_some() {
                return Err(parse_error(format!("根元素之后存在多余元素 <{}>", name)));
            }

            if is_close {
                if depth == 0 {
                    return Err(parse_error(format!("多余的结束标签 </{}>", name)));
                }
                depth -= 1;
                match depth {
                    0 => root_end = Some(RootEnd::Close(whole.start())),
                    1 => {
                        if let Some(child) = open_child.take() {
                            if child.name != name {
                                return Err(parse_error(format!(
                                    "标签不匹配: <{}> 与 </{}>",
                                    child.name, name
                                )));
                            }
                            if !child.nested {
                                let span = child.content_start..whole.start();
                                fields.push(LeafField {
                                    name: child.name,
                                    value: decode_text(&content[span.clone()]),
                                    span,
                                    self_closing: false,
                                });
                            }
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match (depth, self_closing) {
                (0, true) => {
                    root_seen = true;
                    root_end = Some(RootEnd::SelfClosing(whole.range()));
                }
                (0, false) => {
                    root_seen = true;
                    depth = 1;
                }
                (1, true) => {
                    indent.get_or_insert_with(|| line_indent(content, whole.start()));
                    fields.push(LeafField {
                        name: name.to_string(),
                        value: String::new(),
                        span: whole.range(),
                        self_closing: true,
                    });
                }
                (1, false) => {
                    indent.get_or_insert_with(|| line_indent(content, whole.start()));
                    open_child = Some(OpenChild {
                        name: name.to_string(),
                        content_start: whole.end(),
                        nested: false,
                    });
                    depth = 2;
                }
                (_, is_self_closing) => {
                    if let Some(child) = open_child.as_mut() {
                        child.nested = true;
                    }
                    if !is_self_closing {
                        depth += 1;
                    }
                }
            }
        }

        if !root_seen {
            return Err(parse_error("缺少根元素".to_string()));
        }
        let root_end = root_end.ok_or_else(|| parse_error("标签未闭合".to_string()))?;

        Ok(NfoDocument {
            fields,
            root_end,
            indent: indent.unwrap_or_else(|| DEFAULT_INDENT.to_string()),
        })
    }
}

impl DescriptorIo for NfoDescriptorIo {
    fn read(&self, path: &Path) -> Result<FieldMap, DescriptorError> {
        let content = self.load(path)?;
        let doc = self.parse(path, &content)?;

        let mut map = FieldMap::new();
        for field in doc.fields {
            // 重复字段（如多个 <genre>）以第一个为准
            map.entry(field.name).or_insert(field.value);
        }
        Ok(map)
    }

    fn write(&self, path: &Path, fields: &FieldMap) -> Result<(), DescriptorError> {
        let content = self.load(path)?;
        let doc = self.parse(path, &content)?;

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut seen = HashSet::new();

        for field in &doc.fields {
            if !seen.insert(field.name.as_str()) {
                continue;
            }
            let Some(new_value) = fields.get(&field.name) else {
                continue;
            };
            if *new_value == field.value {
                continue;
            }
            let replacement = if field.self_closing {
                element(&field.name, new_value)
            } else {
                escape_text(new_value)
            };
            edits.push((field.span.clone(), replacement));
        }

        let new_fields: Vec<(&String, &String)> = fields
            .iter()
            .filter(|(name, _)| !seen.contains(name.as_str()))
            .collect();

        if !new_fields.is_empty() {
            let lines: String = new_fields
                .iter()
                .map(|(name, value)| format!("{}{}\n", doc.indent, element(name, value)))
                .collect();

            match &doc.root_end {
                RootEnd::Close(pos) => {
                    let line_start = content[..*pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
                    let prefix = &content[line_start..*pos];
                    if line_start > 0 && prefix.chars().all(|c| c == ' ' || c == '\t') {
                        edits.push((line_start..line_start, lines));
                    } else {
                        edits.push((*pos..*pos, format!("\n{}", lines)));
                    }
                }
                RootEnd::SelfClosing(range) => {
                    let tag = &content[range.clone()];
                    let open_tag = format!("{}>", tag.trim_end_matches('>').trim_end_matches('/').trim_end());
                    let root_name = open_tag[1..]
                        .split(|c: char| c.is_whitespace() || c == '>')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    edits.push((
                        range.clone(),
                        format!("{}\n{}</{}>", open_tag, lines, root_name),
                    ));
                }
            }
        }

        if edits.is_empty() {
            return Ok(());
        }

        // 从后往前替换，避免偏移失效
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut output = content;
        for (range, replacement) in edits {
            output.replace_range(range, &replacement);
        }

        fs::write(path, output).map_err(|e| DescriptorError::io(path, e))
    }
}

/// 构造叶子元素
fn element(name: &str, value: &str) -> String {
    format!("<{}>{}</{}>", name, escape_text(value), name)
}

/// 获取标签所在行的缩进（仅当标签前只有空白时）
fn line_indent(content: &str, pos: usize) -> String {
    let line_start = content[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &content[line_start..pos];
    if line_start > 0 && !prefix.is_empty() && prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        DEFAULT_INDENT.to_string()
    }
}

/// 解码元素文本：展开 CDATA、反转义实体并去除首尾空白
fn decode_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("<![CDATA[") {
        out.push_str(&unescape(&rest[..start]));
        let after = &rest[start + "<![CDATA[".len()..];
        match after.find("]]>") {
            Some(end) => {
                out.push_str(&after[..end]);
                rest = &after[end + "]]>".len()..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(&unescape(rest));

    out.trim().to_string()
}

/// 反转义 XML 实体
fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// 转义元素文本
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
