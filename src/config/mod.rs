pub mod prompt;
pub mod settings;

pub use settings::{ Credentials, RuntimeEnv, Settings };
