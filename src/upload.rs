//! multipart 表单的统一收集与字段解析。
//!
//! 各端点的表单结构大同小异（一两个文件 + 若干文本参数），这里一次性
//! 读完整个表单再按名取用，避免每个 handler 重复写字段循环。

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::AppError;

/// 单个上传文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    /// 客户端提交的原始文件名（可能为空）
    pub file_name: String,
}

/// 收集后的表单内容：文件按出现顺序保留（PDF 转换依赖顺序），文本字段取最后一次出现。
#[derive(Debug, Default)]
pub struct FormFields {
    files: Vec<(String, UploadedFile)>,
    texts: HashMap<String, String>,
}

impl FormFields {
    /// 读完整个 multipart 表单。带 filename 的 part 视为文件，其余视为文本字段。
    pub async fn collect(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut out = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field.bytes().await?;
                out.files.push((name, UploadedFile { bytes, file_name }));
            } else {
                let value = field.text().await?;
                out.texts.insert(name, value);
            }
        }
        Ok(out)
    }

    /// 取第一个指定名字的文件
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// 必需文件，缺失报 400
    pub fn require_file(&self, name: &str) -> Result<&UploadedFile, AppError> {
        self.file(name)
            .ok_or_else(|| AppError::MissingField(name.to_string()))
    }

    /// 取所有指定名字的文件（保序）
    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, f)| f)
            .collect()
    }

    /// 文本字段原值（trim 后；空串视为未提供）
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// 必需文本字段
    pub fn require_text(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::MissingField(name.to_string()))
    }

    /// 可选 u32 字段，解析失败报 400 并带字段名
    pub fn opt_u32(&self, name: &str) -> Result<Option<u32>, AppError> {
        self.text(name)
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|_| AppError::Validation(format!("{name} 必须是非负整数: {v}")))
            })
            .transpose()
    }

    /// 必需 u32 字段
    pub fn require_u32(&self, name: &str) -> Result<u32, AppError> {
        self.opt_u32(name)?
            .ok_or_else(|| AppError::MissingField(name.to_string()))
    }

    /// 可选 u8 字段
    pub fn opt_u8(&self, name: &str) -> Result<Option<u8>, AppError> {
        self.text(name)
            .map(|v| {
                v.parse::<u8>()
                    .map_err(|_| AppError::Validation(format!("{name} 必须在 0-255 之间: {v}")))
            })
            .transpose()
    }

    /// 可选 f32 字段
    pub fn opt_f32(&self, name: &str) -> Result<Option<f32>, AppError> {
        self.text(name)
            .map(|v| {
                v.parse::<f32>()
                    .map_err(|_| AppError::Validation(format!("{name} 必须是数字: {v}")))
            })
            .transpose()
    }
}

/// 从客户端文件名提取安全的主干名（去目录、去扩展名、过滤危险字符）。
pub fn sanitize_file_stem(file_name: &str) -> String {
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = base_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(base_name);
    let cleaned = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect::<String>();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_file_stem;

    #[test]
    fn sanitize_strips_path_extension_and_specials() {
        assert_eq!(sanitize_file_stem("photo.png"), "photo");
        assert_eq!(sanitize_file_stem("../../etc/passwd.jpg"), "passwd");
        assert_eq!(sanitize_file_stem("my photo (1).webp"), "myphoto1");
    }

    #[test]
    fn sanitize_without_extension_keeps_only_basename() {
        assert_eq!(sanitize_file_stem("dir/photo"), "photo");
        assert_eq!(sanitize_file_stem("c:\\uploads\\photo"), "photo");
        assert_eq!(sanitize_file_stem("photo"), "photo");
    }

    #[test]
    fn sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_file_stem("照片.png"), "image");
        assert_eq!(sanitize_file_stem(""), "image");
    }
}
