use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

/// Get the cache directory for a given source text
pub fn get_cache_dir(source_text: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    source_text.hash(&mut hasher);
    let source_hash = hasher.finish();

    get_root_cache_dir().join(source_hash.to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("sufler")
}

/// Get the path for a cached validated script
pub fn get_script_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("script.json")
}

/// Get the path for a cached transcript file
pub fn get_transcript_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("transcript.json")
}

/// Get the path for the cue timeline artifact
pub fn get_timeline_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("timeline.json")
}
