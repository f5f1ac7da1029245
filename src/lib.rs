pub mod catalog;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod enhance;
pub mod error;
pub mod http;
pub mod lessons;
pub mod prompts;
pub mod schemas;
pub mod suggest;

// Load env from a simple, standardized location resolution.
// Honors LF_ENV_FILE, otherwise ./.env; a missing file is silently ignored.
pub fn load_env() {
    match std::env::var("LF_ENV_FILE") {
        Ok(path) => {
            let _ = dotenvy::from_path(path);
        }
        Err(_) => {
            let _ = dotenvy::dotenv();
        }
    }
}
