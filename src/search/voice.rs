//! Voice availability / 语音可用性
//!
//! A text hash resolves to at most one voice path (scene dialogue first, then
//! character voice lines). The path only reaches a result when the oracle confirms
//! the asset in one of the result languages.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::models::{LangCode, SearchResult, VoiceFilter};
use crate::store::TextStore;

/// Folder name of each voice language / 语音语言目录名
pub const VOICE_LANGUAGES: [(LangCode, &str); 4] = [
    (LangCode::CHS, "Chinese"),
    (LangCode::EN, "English(US)"),
    (LangCode::JP, "Japanese"),
    (LangCode::KR, "Korean"),
];

pub fn voice_language_name(lang: LangCode) -> Option<&'static str> {
    VOICE_LANGUAGES.iter().find(|(l, _)| *l == lang).map(|(_, name)| *name)
}

/// Resolves whether a playable clip exists / 语音资源查询
#[async_trait]
pub trait VoiceOracle: Send + Sync {
    async fn exists(&self, path: &str, lang: LangCode) -> bool;

    async fn read(&self, path: &str, lang: LangCode) -> Option<Vec<u8>>;

    /// Languages with a loaded voice pack / 已加载的语音语言
    fn loaded_languages(&self) -> Vec<LangCode>;
}

/// Loose audio files under `<asset_dir>/{Persistent,StreamingAssets}/AudioAssets/<Language>/` / 目录语音源
pub struct DirectoryVoiceOracle {
    roots: HashMap<LangCode, Vec<PathBuf>>,
}

impl DirectoryVoiceOracle {
    /// Scan `asset_dir` for language folders; a missing dir yields an empty oracle / 扫描语音目录
    pub fn scan(asset_dir: &str) -> Self {
        let mut roots: HashMap<LangCode, Vec<PathBuf>> = HashMap::new();
        if asset_dir.is_empty() {
            return Self { roots };
        }

        for base in ["Persistent", "StreamingAssets"] {
            let audio = Path::new(asset_dir).join(base).join("AudioAssets");
            for (lang, name) in VOICE_LANGUAGES {
                let dir = audio.join(name);
                if dir.is_dir() {
                    roots.entry(lang).or_default().push(dir);
                }
            }
        }

        let mut loaded: Vec<_> = roots.keys().copied().collect();
        loaded.sort();
        tracing::info!("Voice assets loaded for languages {:?}", loaded);
        Self { roots }
    }

    fn candidates(&self, path: &str, lang: LangCode) -> Vec<PathBuf> {
        // Only plain relative segments; absolute, prefixed or climbing paths leave the root.
        let normalized = path.replace('\\', "/");
        let mut relative = PathBuf::new();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Vec::new(),
            }
        }
        if relative.as_os_str().is_empty() {
            return Vec::new();
        }

        self.roots
            .get(&lang)
            .map(|dirs| dirs.iter().map(|d| d.join(&relative)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VoiceOracle for DirectoryVoiceOracle {
    async fn exists(&self, path: &str, lang: LangCode) -> bool {
        for file in self.candidates(path, lang) {
            if tokio::fs::metadata(&file).await.map(|m| m.is_file()).unwrap_or(false) {
                return true;
            }
        }
        false
    }

    async fn read(&self, path: &str, lang: LangCode) -> Option<Vec<u8>> {
        for file in self.candidates(path, lang) {
            match tokio::fs::read(&file).await {
                Ok(bytes) => return Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!("Failed to read voice file {:?}: {}", file, e);
                }
            }
        }
        None
    }

    fn loaded_languages(&self) -> Vec<LangCode> {
        let mut langs: Vec<_> = self.roots.keys().copied().collect();
        langs.sort();
        langs
    }
}

/// In-memory oracle / 内存语音源
#[derive(Default)]
pub struct StaticVoiceOracle {
    clips: HashMap<(String, LangCode), Vec<u8>>,
}

impl StaticVoiceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(mut self, path: &str, lang: LangCode, bytes: Vec<u8>) -> Self {
        self.clips.insert((path.to_string(), lang), bytes);
        self
    }
}

#[async_trait]
impl VoiceOracle for StaticVoiceOracle {
    async fn exists(&self, path: &str, lang: LangCode) -> bool {
        self.clips.contains_key(&(path.to_string(), lang))
    }

    async fn read(&self, path: &str, lang: LangCode) -> Option<Vec<u8>> {
        self.clips.get(&(path.to_string(), lang)).cloned()
    }

    fn loaded_languages(&self) -> Vec<LangCode> {
        let langs: HashSet<LangCode> = self.clips.keys().map(|(_, l)| *l).collect();
        let mut langs: Vec<_> = langs.into_iter().collect();
        langs.sort();
        langs
    }
}

/// Voice paths of `text_hash` confirmed in at least one of `langs` / 解析可播放的语音路径
pub async fn resolve_voice_paths(
    store: &TextStore,
    oracle: &dyn VoiceOracle,
    text_hash: i64,
    langs: &[LangCode],
) -> Result<Vec<String>> {
    let path = match store.voice_path_in_dialogue(text_hash).await? {
        Some(p) => Some(p),
        None => store.voice_path_in_fetter(text_hash).await?,
    };
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    for &lang in langs {
        if oracle.exists(&path, lang).await {
            return Ok(vec![path]);
        }
    }
    Ok(Vec::new())
}

/// Keep results matching the filter / 按语音筛选
pub fn apply_voice_filter(results: Vec<SearchResult>, filter: VoiceFilter) -> Vec<SearchResult> {
    match filter {
        VoiceFilter::All => results,
        VoiceFilter::With => results.into_iter().filter(|r| r.has_voice()).collect(),
        VoiceFilter::Without => results.into_iter().filter(|r| !r.has_voice()).collect(),
    }
}
