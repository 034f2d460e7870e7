//! Account commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::Endpoint;

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    message: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user_id: i64,
    email: String,
}

pub async fn cmd_register(ep: &Endpoint, username: &str, email: &str, password: &str) -> Result<()> {
    let body = RegisterRequest {
        username,
        email,
        password,
    };
    let resp: RegisterResponse = ep.post_json_body("register/", &body, false).await?;
    println!("{}", resp.message);
    Ok(())
}

pub async fn cmd_login(ep: &Endpoint, username: &str, password: &str) -> Result<()> {
    let body = LoginRequest { username, password };
    let resp: LoginResponse = ep.post_json_body("login/", &body, false).await?;

    println!("═══════════════════════════════════════");
    println!("  Logged in as {}", username);
    println!("═══════════════════════════════════════");
    println!("  User id : {}", resp.user_id);
    println!("  Email   : {}", resp.email);
    println!("  Token   : {}", resp.token);
    println!();
    println!("  export COURIER_TOKEN={}", resp.token);
    Ok(())
}
