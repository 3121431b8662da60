use std::fs;
use std::path::{Path, PathBuf};

/// 写入失败时返回值携带的哨兵前缀
pub const RUN_LOG_WRITE_FAILED: &str = "RUN_LOG_WRITE_FAILED";

/// 运行摘要落盘出口。约定：绝不 panic，失败以哨兵字符串返回，由调用方记日志后忽略
pub trait RunLogSink: Send + Sync {
    fn write(&self, key: &str, data: &[u8]) -> String;
}

/// 以本地目录模拟对象存储：key 即相对路径，成功返回最终位置
pub struct LocalRunLogStore {
    root: PathBuf,
}

impl LocalRunLogStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn try_write(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)
    }
}

impl RunLogSink for LocalRunLogStore {
    fn write(&self, key: &str, data: &[u8]) -> String {
        let path = self.root.join(key);
        match self.try_write(&path, data) {
            Ok(()) => path.display().to_string(),
            Err(e) => format!("{}: {}", RUN_LOG_WRITE_FAILED, e),
        }
    }
}
