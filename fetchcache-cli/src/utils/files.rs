use std::collections::HashSet;
use std::path::Path;

use fetchcache_engine::CacheKey;
use url::Url;

use crate::error::AppError;

/// Creates all directories in the given path, including parent directories if they don't exist.
#[inline]
pub async fn create_dirs(path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(AppError::Io)?;
    Ok(())
}

/// Pick the output file name for a fetched resource.
///
/// Uses the last path segment of the resolved URL; falls back to the cache
/// key when the URL has no usable segment.
pub fn output_file_name(uri: &Url, identifier: &str) -> String {
    let segment = uri
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..");

    match segment {
        Some(name) => name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect(),
        None => CacheKey::for_identifier(identifier).to_string(),
    }
}

/// Make every name in `names` unique, keeping order.
///
/// The first occurrence keeps its name; later ones get a `-N` suffix before
/// the extension (`logo.png`, `logo-1.png`, ...).
pub fn unique_file_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name;
            }
            let (stem, ext) = match name.rfind('.') {
                Some(dot) if dot > 0 => name.split_at(dot),
                _ => (name.as_str(), ""),
            };
            let mut n = 1usize;
            loop {
                let candidate = format!("{stem}-{n}{ext}");
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}
