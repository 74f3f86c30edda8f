//! EJ REST routes, relative to the API base (`<host>/api/v1`).

pub fn board(api_url: &str, board_id: u64) -> String {
    format!("{api_url}/boards/{board_id}/")
}

pub fn conversation(api_url: &str, conversation_id: u64) -> String {
    format!("{api_url}/conversations/{conversation_id}/")
}

pub fn random_comment(api_url: &str, conversation_id: u64) -> String {
    format!("{}random-comment/", conversation(api_url, conversation_id))
}

pub fn user_statistics(api_url: &str, conversation_id: u64) -> String {
    format!("{}user-statistics/", conversation(api_url, conversation_id))
}

pub fn token(api_url: &str) -> String {
    format!("{api_url}/token/")
}

pub fn registration(api_url: &str) -> String {
    format!("{api_url}/users/")
}

pub fn refresh_token(api_url: &str) -> String {
    format!("{api_url}/refresh-token/")
}

pub fn votes(api_url: &str) -> String {
    format!("{api_url}/votes/")
}

pub fn comments(api_url: &str) -> String {
    format!("{api_url}/comments/")
}

pub fn my_profile(api_url: &str) -> String {
    format!("{api_url}/profiles/me/")
}

pub fn profile(api_url: &str, user: u64) -> String {
    format!("{api_url}/profiles/{user}/")
}
