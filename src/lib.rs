//! Motor de inventário de ingressos: capacidade, estoque compartilhado,
//! ajuste atômico de vendas, cache de ingressos e check-in de participantes.

pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
