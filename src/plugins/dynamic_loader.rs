//! 动态库加载器
//!
//! 按平台路径打开单个共享库、解析导出符号，并把各平台的失败统一成
//! [`DynamicLibraryError`]。库句柄只释放一次，显式释放或析构时均可。

use std::ffi::c_void;
use std::ptr::NonNull;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 动态库错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DynamicLibraryError {
    #[error("Failed to load dynamic library: {library}\n{detail}")]
    LoadingFailed { library: String, detail: String },

    #[error("Symbol [{symbol}] not found in dynamic library: {library}\n{detail}")]
    SymbolNotFound {
        library: String,
        symbol: String,
        detail: String,
    },
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryErrorCause {
    /// 加载失败
    LoadingFailed,
    /// 符号不存在
    SymbolNotFound,
}

impl DynamicLibraryError {
    pub fn cause(&self) -> LibraryErrorCause {
        match self {
            Self::LoadingFailed { .. } => LibraryErrorCause::LoadingFailed,
            Self::SymbolNotFound { .. } => LibraryErrorCause::SymbolNotFound,
        }
    }

    /// 出错的库
    pub fn library(&self) -> &str {
        match self {
            Self::LoadingFailed { library, .. } | Self::SymbolNotFound { library, .. } => library,
        }
    }
}

/// 平台加载原语
trait PlatformLibrary: Sized {
    /// 打开库，失败时返回平台错误描述
    fn open(path: &str) -> Result<Self, String>;

    /// 解析符号地址
    fn resolve(&self, symbol: &str) -> Result<*mut c_void, String>;

    /// 关闭库
    fn close(self) -> Result<(), String>;
}

#[cfg(unix)]
type NativeLibrary = libloading::os::unix::Library;

#[cfg(windows)]
type NativeLibrary = libloading::os::windows::Library;

#[cfg(any(unix, windows))]
impl PlatformLibrary for NativeLibrary {
    fn open(path: &str) -> Result<Self, String> {
        // SAFETY: 加载库会执行其初始化代码，调用者需要信任被加载的插件
        unsafe { NativeLibrary::new(path) }.map_err(|e| e.to_string())
    }

    fn resolve(&self, symbol: &str) -> Result<*mut c_void, String> {
        // SAFETY: 只读取符号地址，不按任何具体类型调用
        let address = unsafe { self.get::<*mut c_void>(symbol.as_bytes()) }.map_err(|e| e.to_string())?;
        Ok(*address)
    }

    fn close(self) -> Result<(), String> {
        NativeLibrary::close(self).map_err(|e| e.to_string())
    }
}

/// 不支持动态加载的平台：打开总是失败
#[cfg(not(any(unix, windows)))]
enum NativeLibrary {}

#[cfg(not(any(unix, windows)))]
impl PlatformLibrary for NativeLibrary {
    fn open(_path: &str) -> Result<Self, String> {
        Err("dynamic libraries are not supported on this platform".to_string())
    }

    fn resolve(&self, _symbol: &str) -> Result<*mut c_void, String> {
        match *self {}
    }

    fn close(self) -> Result<(), String> {
        match self {}
    }
}

/// 动态库管理器
///
/// 一个实例拥有一个库句柄。通过 [`find_symbol`](Self::find_symbol) 取得的地址
/// 只在库释放前有效。
pub struct DynamicLibraryManager {
    library_name: String,
    handle: Option<NativeLibrary>,
}

impl DynamicLibraryManager {
    /// 立即加载指定的库
    pub fn new(library_name: &str) -> Result<Self, DynamicLibraryError> {
        let handle = <NativeLibrary as PlatformLibrary>::open(library_name).map_err(|detail| {
            warn!("Failed to load dynamic library {}: {}", library_name, detail);
            DynamicLibraryError::LoadingFailed {
                library: library_name.to_string(),
                detail,
            }
        })?;

        info!("Loaded dynamic library: {}", library_name);
        Ok(Self {
            library_name: library_name.to_string(),
            handle: Some(handle),
        })
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// 库句柄是否仍然持有
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// 查找导出符号。空地址与已释放的库同样视为符号不存在。
    pub fn find_symbol(&self, symbol: &str) -> Result<NonNull<c_void>, DynamicLibraryError> {
        let not_found = |detail: String| DynamicLibraryError::SymbolNotFound {
            library: self.library_name.clone(),
            symbol: symbol.to_string(),
            detail,
        };

        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| not_found("library has been released".to_string()))?;
        let address = handle.resolve(symbol).map_err(not_found)?;
        let address = NonNull::new(address).ok_or_else(|| not_found("symbol address is null".to_string()))?;

        debug!("Resolved symbol '{}' in {}", symbol, self.library_name);
        Ok(address)
    }

    /// 释放库句柄，可重复调用
    pub fn release_library(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match PlatformLibrary::close(handle) {
            Ok(()) => info!("Released dynamic library: {}", self.library_name),
            Err(e) => warn!("Failed to release dynamic library {}: {}", self.library_name, e),
        }
    }
}

impl Drop for DynamicLibraryManager {
    fn drop(&mut self) {
        self.release_library();
    }
}

impl std::fmt::Debug for DynamicLibraryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibraryManager")
            .field("library_name", &self.library_name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
