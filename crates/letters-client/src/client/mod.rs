//! Letters API client.

mod executor;
mod letters;
mod refresh;

pub use executor::{ApiRequest, RawResponse, RequestExecutor};
pub use letters::LettersClient;
pub use refresh::{RefreshCoordinator, RefreshState};

pub const TOKEN_PATH: &str = "/api/token/";
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";
pub const SIGNUP_PATH: &str = "/api/signup/";
pub const PASSWORD_RESET_PATH: &str = "/api/password-reset/";
pub const LETTERS_PATH: &str = "/api/letters/";

pub fn cancel_path(letter_id: i64) -> String {
    format!("{}{}/cancel/", LETTERS_PATH, letter_id)
}

pub fn restore_path(letter_id: i64) -> String {
    format!("{}{}/restore/", LETTERS_PATH, letter_id)
}
