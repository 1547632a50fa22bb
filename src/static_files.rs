//! Static asset resolution and filesystem streaming.
//!
//! A request whose last path segment looks like a file name and that no route
//! entry claimed is resolved here. The first segment is taken as the owning
//! module when it names one; the rest is the file URL within that module's
//! public directory.

use crate::dispatcher::AssetStreamer;
use crate::error::DispatchError;
use crate::module::{Module, ModuleResolver};
use crate::request::decode_segment;
use crate::response::Response;
use crate::route::ResolvedRoute;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// CSS served from a preprocessor source directory
const PREPROCESSORS: [&str; 2] = ["less", "sass"];

/// Resolve `segments` as a static file owned by `module` or by the module
/// named in the first segment.
///
/// The first segment is always consumed as an owner guess when more than one
/// segment is present. The guess is only honoured when it names a known
/// module and `module` was not selected by path; otherwise `module` owns the
/// file.
#[must_use]
pub fn resolve_static(segments: &[String], module: &Module, modules: &ModuleResolver) -> Option<ResolvedRoute> {
    let last = segments.last()?;
    let (_, extension) = last.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }

    let (owner, rest) = match segments.split_first() {
        Some((guess, rest)) if !rest.is_empty() => {
            let valid = modules.is_module(guess) && !module.is_path_resolved();
            (if valid { guess.as_str() } else { module.name.as_str() }, rest)
        }
        _ => (module.name.as_str(), segments),
    };

    let mut file_type = extension.to_ascii_lowercase();
    if file_type == "css" {
        if let Some(pre) = PREPROCESSORS
            .iter()
            .find(|p| rest.iter().any(|s| s.as_str() == **p))
        {
            file_type = (*pre).to_string();
        }
    }

    let file_url = rest.iter().map(|s| decode_segment(s)).collect::<Vec<_>>().join("/");
    Some(ResolvedRoute::file(owner, file_type, file_url))
}

/// Serves files from `<modules root>/<owner>/<public dir>/<file url>`
pub struct FsAssetStreamer {
    modules_root: PathBuf,
    public_dir: String,
}

impl FsAssetStreamer {
    pub fn new<P: Into<PathBuf>>(modules_root: P, public_dir: impl Into<String>) -> Self {
        Self {
            modules_root: modules_root.into(),
            public_dir: public_dir.into(),
        }
    }

    /// Join `url_path` under `base`, refusing anything but plain components
    fn map_path(base: &Path, url_path: &str) -> Option<PathBuf> {
        let mut pb = base.to_path_buf();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    #[must_use]
    pub fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }

    fn read(&self, owner: &str, file_url: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let base = self.modules_root.join(owner).join(&self.public_dir);
        let path = Self::map_path(&base, file_url)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl AssetStreamer for FsAssetStreamer {
    fn stream(&self, owner: &str, file_type: &str, file_url: &str) -> Result<Response, DispatchError> {
        if PREPROCESSORS.contains(&file_type) {
            return Err(DispatchError::debug(format!(
                "no asset streamer for '{file_type}' sources ({file_url})"
            )));
        }
        match self.read(owner, file_url) {
            Ok((bytes, content_type)) => {
                debug!(owner = %owner, file_url = %file_url, bytes = bytes.len(), "Static file served");
                Ok(Response::bytes(200, content_type, bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(owner = %owner, file_url = %file_url, "Static file not found");
                Ok(Response::not_found())
            }
            Err(e) => {
                warn!(owner = %owner, file_url = %file_url, error = %e, "Static file read failed");
                Err(DispatchError::Unclassified(e.into()))
            }
        }
    }
}
