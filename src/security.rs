//! Security Module
//!
//! 入力ファイル読み込み時のサイズ制限を実装するモジュール。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::FioMatchError;

/// セキュリティ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

/// 入力ファイルをサイズ制限付きでメモリに読み込む
///
/// # 引数
///
/// * `path` - 読み込むファイルのパス
/// * `config` - セキュリティ設定
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - ファイルの内容
/// * `Err(FioMatchError::UnreadableFile)` - ファイルを開けない、または読み込めない場合
/// * `Err(FioMatchError::SecurityViolation)` - ファイルサイズが上限を超える場合
pub(crate) fn read_input_file(
    path: &Path,
    config: &SecurityConfig,
) -> Result<Vec<u8>, FioMatchError> {
    let file = File::open(path).map_err(|e| FioMatchError::unreadable(path, e))?;

    // 上限+1バイトまで読み、超過を検出する
    let mut buffer = Vec::new();
    let bytes_read = file
        .take(config.max_input_file_size.saturating_add(1))
        .read_to_end(&mut buffer)
        .map_err(|e| FioMatchError::unreadable(path, e))?;

    if bytes_read as u64 > config.max_input_file_size {
        return Err(FioMatchError::SecurityViolation(format!(
            "Input file '{}' exceeds maximum size: {} bytes",
            path.display(),
            config.max_input_file_size
        )));
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_input_file_within_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<List/>").unwrap();

        let data = read_input_file(file.path(), &SecurityConfig::default()).unwrap();
        assert_eq!(data, b"<List/>");
    }

    #[test]
    fn test_read_input_file_exceeds_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 32]).unwrap();

        let config = SecurityConfig {
            max_input_file_size: 16,
        };
        match read_input_file(file.path(), &config) {
            Err(FioMatchError::SecurityViolation(msg)) => {
                assert!(msg.contains("exceeds maximum size"));
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_read_input_file_exact_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 16]).unwrap();

        let config = SecurityConfig {
            max_input_file_size: 16,
        };
        assert_eq!(read_input_file(file.path(), &config).unwrap().len(), 16);
    }

    #[test]
    fn test_read_input_file_missing() {
        let result = read_input_file(
            Path::new("/nonexistent/dir/input.xml"),
            &SecurityConfig::default(),
        );
        assert!(matches!(result, Err(FioMatchError::UnreadableFile { .. })));
    }
}
