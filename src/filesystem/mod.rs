// 本地文件系统访问模块
//
// 批量编辑前的目录校验：路径规范化、白名单、隐藏文件与符号链接策略

mod guard;

pub use crate::config::FilesystemConfig;
pub use guard::PathGuard;
