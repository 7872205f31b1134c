pub mod config;
pub mod content;
pub mod error;
pub mod io;
pub mod prefs;
pub mod script;
pub mod settings;
pub mod voice;
pub mod wizard;
