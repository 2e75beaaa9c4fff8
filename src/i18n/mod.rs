pub mod dictionary;

pub use dictionary::{DictionaryLoader, LoadedDictionary, Locale};
