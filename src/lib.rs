//! 凭据服务库
//! 密码哈希校验与无状态会话令牌，以及承载它们的 HTTP 服务

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
