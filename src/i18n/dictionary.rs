use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

const BUNDLED_EN: &str = include_str!("../../locales/en.json");
const BUNDLED_ZH_TW: &str = include_str!("../../locales/zh-TW.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::ZhTw];

    pub fn tag(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::ZhTw => "zh-TW",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|locale| locale.tag().eq_ignore_ascii_case(tag.trim()))
    }

    fn bundled(&self) -> &'static str {
        match self {
            Locale::En => BUNDLED_EN,
            Locale::ZhTw => BUNDLED_ZH_TW,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedDictionary {
    pub locale: Locale,
    pub dictionary: Value,
}

/// Resolves translation bundles. Never fails: anything unusable falls back to
/// English.
#[derive(Debug, Clone, Default)]
pub struct DictionaryLoader {
    override_dir: Option<PathBuf>,
}

impl DictionaryLoader {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub async fn load(&self, tag: &str) -> LoadedDictionary {
        match Locale::parse(tag) {
            Some(locale) => self.load_locale(locale).await,
            None => {
                log::warn!("Locale \"{}\" not found, falling back to default (en).", tag);
                self.load_locale(Locale::En).await
            }
        }
    }

    pub async fn load_locale(&self, locale: Locale) -> LoadedDictionary {
        let Some(dir) = &self.override_dir else {
            return bundled(locale);
        };

        let path = dir.join(format!("{}.json", locale.tag()));
        let loaded = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<Value>(&raw).map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };

        match loaded {
            Ok(dictionary) => LoadedDictionary { locale, dictionary },
            Err(e) => {
                log::warn!(
                    "Failed to load dictionary for locale {} from {}: {}",
                    locale.tag(),
                    path.display(),
                    e
                );
                bundled(Locale::En)
            }
        }
    }
}

fn bundled(locale: Locale) -> LoadedDictionary {
    let dictionary = serde_json::from_str(locale.bundled()).unwrap_or_else(|e| {
        log::error!("bundled dictionary {} is malformed: {}", locale.tag(), e);
        Value::Object(Default::default())
    });
    LoadedDictionary { locale, dictionary }
}
